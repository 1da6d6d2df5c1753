use chronicle_cli::commands::{
    campaign, clock, item, npc, ooc, quest, relationship, reward, rumor, secret, spell, state,
    turn, validate,
};
use chronicle_cli::{CmdResult, CommandError, Ctx, Envelope};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dmctl")]
#[command(about = "Turn-scoped transactional state engine for tabletop campaigns", long_about = None)]
struct Cli {
    /// State root; campaigns live under <root>/campaigns/<id>/
    #[arg(long, global = true, default_value = ".dm")]
    root: PathBuf,

    /// Campaign id the command addresses
    #[arg(long, global = true)]
    campaign: Option<String>,

    /// JSON payload for the command
    #[arg(long, global = true)]
    payload: Option<String>,

    /// Include the full diff and snapshot in responses
    #[arg(long, global = true)]
    full: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Campaign lifecycle and maintenance
    Campaign {
        #[command(subcommand)]
        action: CampaignAction,
    },
    /// Turn lifecycle: begin, commit, rollback, diff
    Turn {
        #[command(subcommand)]
        action: TurnAction,
    },
    /// Bulk state reads and writes
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    Npc {
        #[command(subcommand)]
        action: NpcAction,
    },
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },
    Relationship {
        #[command(subcommand)]
        action: RelationshipAction,
    },
    Quest {
        #[command(subcommand)]
        action: QuestAction,
    },
    Rumor {
        #[command(subcommand)]
        action: RumorAction,
    },
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
    Clock {
        #[command(subcommand)]
        action: ClockAction,
    },
    Spell {
        #[command(subcommand)]
        action: SpellAction,
    },
    Reward {
        #[command(subcommand)]
        action: RewardAction,
    },
    /// Out-of-character table controls
    Ooc {
        #[command(subcommand)]
        action: OocAction,
    },
    /// Health-check one campaign, or every campaign under the root
    Validate,
}

#[derive(Subcommand)]
enum CampaignAction {
    Create {
        #[arg(long)]
        name: Option<String>,
    },
    Load,
    Seed,
    /// Reconcile the append log with the database (the database wins)
    RepairEvents {
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum TurnAction {
    Begin,
    Commit {
        #[arg(long)]
        summary: String,
    },
    Rollback {
        #[arg(long)]
        reason: Option<String>,
    },
    /// Stored diff for the latest committed turn, or a specific one
    Diff {
        #[arg(long)]
        turn: Option<i64>,
    },
    /// Human-readable turn ledger
    Timeline,
}

#[derive(Subcommand)]
enum StateAction {
    Set,
    Get,
}

#[derive(Subcommand)]
enum NpcAction {
    Create,
}

#[derive(Subcommand)]
enum ItemAction {
    Grant,
    Consume,
}

#[derive(Subcommand)]
enum RelationshipAction {
    Adjust,
}

#[derive(Subcommand)]
enum QuestAction {
    Add,
    Update,
}

#[derive(Subcommand)]
enum RumorAction {
    Add,
    Reveal,
}

#[derive(Subcommand)]
enum SecretAction {
    Add,
    Reveal,
}

#[derive(Subcommand)]
enum ClockAction {
    Tick,
}

#[derive(Subcommand)]
enum SpellAction {
    Cast,
    End,
}

#[derive(Subcommand)]
enum RewardAction {
    Grant,
}

#[derive(Subcommand)]
enum OocAction {
    UndoLastTurn {
        #[arg(long)]
        reason: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let payload = match cli.payload.as_deref() {
        None => None,
        Some(raw) => match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                let envelope = Envelope::fail(
                    "payload",
                    "invalid_payload",
                    serde_json::json!({ "message": format!("payload is not valid JSON: {err}") }),
                );
                println!("{}", envelope.render());
                std::process::exit(1);
            }
        },
    };
    let ctx = Ctx::new(cli.root, cli.campaign, payload, cli.full);

    // The timeline command is a human view; everything else speaks JSON.
    if let Commands::Turn { action: TurnAction::Timeline } = &cli.command {
        if let Err(err) = turn::timeline(&ctx) {
            let envelope = Envelope::fail("turn timeline", &err.code, err.details);
            println!("{}", envelope.render());
            std::process::exit(1);
        }
        return Ok(());
    }

    let (command, result) = dispatch(&cli.command, &ctx);
    let envelope = match result {
        Ok(data) => Envelope::ok(command, data),
        Err(err) => {
            tracing::debug!(command, code = %err.code, "command failed");
            Envelope::fail(command, &err.code, err.details)
        }
    };
    println!("{}", envelope.render());
    if !envelope.ok {
        std::process::exit(1);
    }
    Ok(())
}

fn dispatch(command: &Commands, ctx: &Ctx) -> (&'static str, CmdResult) {
    match command {
        Commands::Campaign { action } => match action {
            CampaignAction::Create { name } => {
                ("campaign create", campaign::create(ctx, name.as_deref()))
            }
            CampaignAction::Load => ("campaign load", campaign::load(ctx)),
            CampaignAction::Seed => ("campaign seed", campaign::seed(ctx)),
            CampaignAction::RepairEvents { dry_run } => {
                ("campaign repair-events", campaign::repair(ctx, *dry_run))
            }
        },
        Commands::Turn { action } => match action {
            TurnAction::Begin => ("turn begin", turn::begin(ctx)),
            TurnAction::Commit { summary } => ("turn commit", turn::commit(ctx, summary)),
            TurnAction::Rollback { reason } => {
                ("turn rollback", turn::rollback(ctx, reason.as_deref()))
            }
            TurnAction::Diff { turn: turn_number } => ("turn diff", turn::diff(ctx, *turn_number)),
            TurnAction::Timeline => (
                "turn timeline",
                Err(CommandError::new("internal", "timeline is handled before dispatch")),
            ),
        },
        Commands::State { action } => match action {
            StateAction::Set => ("state set", state::set(ctx)),
            StateAction::Get => ("state get", state::get(ctx)),
        },
        Commands::Npc { action } => match action {
            NpcAction::Create => ("npc create", npc::create(ctx)),
        },
        Commands::Item { action } => match action {
            ItemAction::Grant => ("item grant", item::grant(ctx)),
            ItemAction::Consume => ("item consume", item::consume(ctx)),
        },
        Commands::Relationship { action } => match action {
            RelationshipAction::Adjust => ("relationship adjust", relationship::adjust(ctx)),
        },
        Commands::Quest { action } => match action {
            QuestAction::Add => ("quest add", quest::add(ctx)),
            QuestAction::Update => ("quest update", quest::update(ctx)),
        },
        Commands::Rumor { action } => match action {
            RumorAction::Add => ("rumor add", rumor::add(ctx)),
            RumorAction::Reveal => ("rumor reveal", rumor::reveal(ctx)),
        },
        Commands::Secret { action } => match action {
            SecretAction::Add => ("secret add", secret::add(ctx)),
            SecretAction::Reveal => ("secret reveal", secret::reveal(ctx)),
        },
        Commands::Clock { action } => match action {
            ClockAction::Tick => ("clock tick", clock::tick(ctx)),
        },
        Commands::Spell { action } => match action {
            SpellAction::Cast => ("spell cast", spell::cast(ctx)),
            SpellAction::End => ("spell end", spell::end(ctx)),
        },
        Commands::Reward { action } => match action {
            RewardAction::Grant => ("reward grant", reward::grant(ctx)),
        },
        Commands::Ooc { action } => match action {
            OocAction::UndoLastTurn { reason } => {
                ("ooc undo_last_turn", ooc::undo_last_turn(ctx, reason.as_deref()))
            }
        },
        Commands::Validate => ("validate", validate::run(ctx)),
    }
}
