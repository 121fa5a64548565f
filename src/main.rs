use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chess_pairing::config::AppConfig;
use chess_pairing::models::{EntityId, EntityKind, Player, PlayerId, Round};
use chess_pairing::pairing::{SeededRng, SystemRng};
use chess_pairing::storage::{
    load_tournament, save_tournament, JsonlStore, RecordStore, TournamentRecord,
};
use chess_pairing::tournament::Tournament;

#[derive(Parser)]
#[command(name = "chess-pairing")]
#[command(about = "Round-robin pairing and scoring for local chess tournaments")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage registered players
    Player {
        #[command(subcommand)]
        action: PlayerAction,
    },

    /// Manage tournaments
    Tournament {
        #[command(subcommand)]
        action: TournamentAction,
    },
}

#[derive(Subcommand)]
enum PlayerAction {
    /// Register a new player
    Add {
        #[arg(long)]
        last_name: String,

        #[arg(long)]
        first_name: String,

        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: NaiveDate,

        /// National chess ID, e.g. AB12345
        #[arg(long)]
        chess_id: String,
    },

    /// List registered players
    List,
}

#[derive(Subcommand)]
enum TournamentAction {
    /// Create a new tournament
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        place: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Number of rounds (defaults to the configured value)
        #[arg(long)]
        rounds: Option<u32>,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List tournaments
    List,

    /// Show a tournament with its rounds and matches
    Show { tournament: EntityId },

    /// Add a registered player before the tournament starts
    AddParticipant { tournament: EntityId, player: EntityId },

    /// Remove a player before the tournament starts
    RemoveParticipant { tournament: EntityId, player: EntityId },

    /// Freeze the roster and create the first round
    Start {
        tournament: EntityId,

        /// Seed the initial shuffle for a reproducible schedule
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Enter or reset the result of a match in the current round
    Result {
        tournament: EntityId,

        #[arg(value_name = "MATCH")]
        match_id: EntityId,

        #[command(flatten)]
        outcome: Outcome,
    },

    /// Close the current round
    CompleteRound {
        tournament: EntityId,

        /// Round name, e.g. Round_2 (defaults to the current round)
        #[arg(long)]
        round: Option<String>,
    },

    /// Pair the next round from the current ranking
    NextRound { tournament: EntityId },

    /// Show the ranking
    Ranking { tournament: EntityId },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Outcome {
    /// Player who won the match
    #[arg(long)]
    winner: Option<EntityId>,

    /// The match was drawn
    #[arg(long)]
    draw: bool,

    /// Clear a result entered by mistake
    #[arg(long)]
    reset: bool,
}

fn expect_kind(id: EntityId, kind: EntityKind) -> Result<EntityId> {
    if id.kind() != kind {
        bail!("{} is not a {} ID", id, kind);
    }
    Ok(id)
}

fn player_names(store: &JsonlStore) -> Result<HashMap<PlayerId, String>> {
    Ok(store
        .load_all::<Player>()?
        .into_iter()
        .map(|p| (p.id, p.full_name()))
        .collect())
}

fn display_name(names: &HashMap<PlayerId, String>, id: PlayerId) -> String {
    match names.get(&id) {
        Some(name) => format!("{} ({})", name, id),
        None => id.to_string(),
    }
}

fn print_round(round: &Round, names: &HashMap<PlayerId, String>) {
    let status = if round.is_finished { "finished" } else { "open" };
    println!("{} [{}] {}", round.name, round.id, status);
    for m in &round.matches {
        let [a, b] = m.players();
        let outcome = match (m.is_finished(), m.winner()) {
            (false, _) => "pending".to_string(),
            (true, Some(winner)) => format!("won by {}", display_name(names, winner)),
            (true, None) => "draw".to_string(),
        };
        println!(
            "  {}  {} vs {}  {}",
            m.id(),
            display_name(names, a),
            display_name(names, b),
            outcome
        );
    }
}

fn print_ranking(tournament: &Tournament, names: &HashMap<PlayerId, String>) {
    println!("=== Ranking: {} ===", tournament.name);
    for group in tournament.get_ranking().groups() {
        for player in &group.players {
            println!(
                "{:>3}. {:<40} {:>4}",
                group.rank,
                display_name(names, *player),
                group.score
            );
        }
    }
}

fn run_player(action: PlayerAction, store: &mut JsonlStore) -> Result<()> {
    match action {
        PlayerAction::Add {
            last_name,
            first_name,
            birth_date,
            chess_id,
        } => {
            let id = store.next_id(EntityKind::Player)?;
            let player = Player::new(id, &last_name, &first_name, birth_date, &chess_id)?;
            store.save(&player)?;
            println!("Registered {} as {}", player.full_name(), player.id);
        }

        PlayerAction::List => {
            let players = store.load_all::<Player>()?;
            if players.is_empty() {
                println!("No players registered.");
            }
            for player in players {
                println!(
                    "{:<6} {:<30} {}  {}",
                    player.id.to_string(),
                    player.full_name(),
                    player.birth_date,
                    player.chess_id
                );
            }
        }
    }
    Ok(())
}

fn run_tournament(
    action: TournamentAction,
    store: &mut JsonlStore,
    config: &AppConfig,
) -> Result<()> {
    match action {
        TournamentAction::Create {
            name,
            place,
            start,
            end,
            rounds,
            description,
        } => {
            let id = store.next_id(EntityKind::Tournament)?;
            let rounds = rounds.unwrap_or(config.tournament.rounds_number);
            let tournament =
                Tournament::new(id, &name, &place, start, end, rounds)?.with_description(&description);
            save_tournament(store, &tournament)?;
            println!(
                "Created {} ({}) with {} rounds",
                tournament.name, tournament.id, rounds
            );
        }

        TournamentAction::List => {
            let records = store.load_all::<TournamentRecord>()?;
            if records.is_empty() {
                println!("No tournaments.");
            }
            for record in records {
                let status = if record.is_complete {
                    "complete"
                } else if record.first_pairing.is_some() {
                    "in progress"
                } else {
                    "not started"
                };
                println!(
                    "{:<6} {:<30} {:<20} {} -> {}  {}",
                    record.id.to_string(),
                    record.name,
                    record.place,
                    record.date_start,
                    record.date_end,
                    status
                );
            }
        }

        TournamentAction::Show { tournament } => {
            let tournament = load_tournament(store, expect_kind(tournament, EntityKind::Tournament)?)?;
            let names = player_names(store)?;

            println!("=== {} ({}) ===", tournament.name, tournament.id);
            println!("Place:    {}", tournament.place);
            println!("Dates:    {} -> {}", tournament.date_start, tournament.date_end);
            if !tournament.description.is_empty() {
                println!("About:    {}", tournament.description);
            }
            println!("Players:  {}", tournament.participants().count());
            match tournament.current_round_name() {
                Some(name) if tournament.is_started() => println!("Current:  {}", name),
                Some(_) => println!("Current:  not started"),
                None => println!("Current:  complete"),
            }
            println!();
            for (name, round) in tournament.rounds() {
                match round {
                    Some(round) => print_round(round, &names),
                    None => println!("{} not created", name),
                }
            }
        }

        TournamentAction::AddParticipant { tournament, player } => {
            let mut tournament =
                load_tournament(store, expect_kind(tournament, EntityKind::Tournament)?)?;
            let player: Player = store.load(expect_kind(player, EntityKind::Player)?)?;
            tournament.add_participant(player.id)?;
            save_tournament(store, &tournament)?;
            println!("Added {} to {}", player.full_name(), tournament.name);
        }

        TournamentAction::RemoveParticipant { tournament, player } => {
            let mut tournament =
                load_tournament(store, expect_kind(tournament, EntityKind::Tournament)?)?;
            tournament.remove_participant(expect_kind(player, EntityKind::Player)?)?;
            save_tournament(store, &tournament)?;
            println!("Removed {} from {}", player, tournament.name);
        }

        TournamentAction::Start { tournament, seed } => {
            let mut tournament =
                load_tournament(store, expect_kind(tournament, EntityKind::Tournament)?)?;
            let mut ids = store.id_allocator()?;
            match seed {
                Some(seed) => {
                    tournament.initialize_first_round(&mut SeededRng::from_seed(seed), &mut ids)?
                }
                None => tournament.initialize_first_round(&mut SystemRng, &mut ids)?,
            };
            save_tournament(store, &tournament)?;

            let names = player_names(store)?;
            if let Some(round) = tournament.current_round() {
                print_round(round, &names);
            }
        }

        TournamentAction::Result {
            tournament,
            match_id,
            outcome,
        } => {
            let mut tournament =
                load_tournament(store, expect_kind(tournament, EntityKind::Tournament)?)?;
            let m = tournament.current_match_mut(expect_kind(match_id, EntityKind::Match)?)?;
            if let Some(winner) = outcome.winner {
                m.decide_win(winner)?;
            } else if outcome.draw {
                m.decide_draw()?;
            } else {
                m.reset()?;
            }
            save_tournament(store, &tournament)?;

            let names = player_names(store)?;
            if let Some(round) = tournament.current_round() {
                print_round(round, &names);
            }
        }

        TournamentAction::CompleteRound { tournament, round } => {
            let mut tournament =
                load_tournament(store, expect_kind(tournament, EntityKind::Tournament)?)?;
            let Some(name) = round.or_else(|| tournament.current_round_name()) else {
                bail!("{} has no round left to complete", tournament.name);
            };
            tournament.complete_round(&name)?;
            save_tournament(store, &tournament)?;

            println!("{} completed", name);
            if tournament.is_complete() {
                println!("{} is complete", tournament.name);
            }
            print_ranking(&tournament, &player_names(store)?);
        }

        TournamentAction::NextRound { tournament } => {
            let mut tournament =
                load_tournament(store, expect_kind(tournament, EntityKind::Tournament)?)?;
            let mut ids = store.id_allocator()?;
            tournament.create_next_round(&mut ids)?;
            save_tournament(store, &tournament)?;

            let names = player_names(store)?;
            if let Some(round) = tournament.current_round() {
                print_round(round, &names);
            }
        }

        TournamentAction::Ranking { tournament } => {
            let tournament =
                load_tournament(store, expect_kind(tournament, EntityKind::Tournament)?)?;
            print_ranking(&tournament, &player_names(store)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }
    config.json_logs |= cli.json_logs;
    config.validate()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!("Starting chess-pairing v{}", env!("CARGO_PKG_VERSION"));

    let mut store = JsonlStore::new(config.storage());

    match cli.command {
        Commands::Player { action } => run_player(action, &mut store),
        Commands::Tournament { action } => run_tournament(action, &mut store, &config),
    }
}
