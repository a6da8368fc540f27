use anyhow::Result;
use clap::Args;

use getty::{AnyStore, GettyService};

use crate::commands::settle;
use crate::examples::ExampleGroup;
use crate::output::{Answer, OutputManager};

pub const FOLLOW_EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Follow",
        commands: &[
            "getty follow bob alice               # bob starts following alice",
            "getty unfollow bob alice",
        ],
    },
    ExampleGroup {
        title: "Inspect",
        commands: &[
            "getty friends bob                    # Who bob follows and who follows bob",
            "getty friends bob --is-following alice",
        ],
    },
];

pub const REPAIR_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Consistency",
    commands: &[
        "getty audit bob                      # List one-sided edges touching bob",
        "getty repair bob                     # Rewrite followers from bob's following list",
        "getty --write-mode sequential follow bob alice",
    ],
}];

#[derive(Args)]
pub struct EdgeArgs {
    /// User initiating the change
    pub user_id: String,

    /// User being followed or unfollowed
    pub target_id: String,
}

#[derive(Args)]
pub struct FriendsArgs {
    /// User whose friend record to show
    pub user_id: String,

    /// Only report whether the user follows this target
    #[arg(long, value_name = "TARGET")]
    pub is_following: Option<String>,
}

pub async fn handle_follow(args: EdgeArgs, service: &GettyService<AnyStore>, output: &OutputManager) -> Result<()> {
    let record = settle(service.follow(&args.user_id, &args.target_id).await)?;
    output.success(&format!("{} now follows {}", args.user_id, args.target_id));
    output.display(&record)
}

pub async fn handle_unfollow(args: EdgeArgs, service: &GettyService<AnyStore>, output: &OutputManager) -> Result<()> {
    let record = settle(service.unfollow(&args.user_id, &args.target_id).await)?;
    output.success(&format!("{} no longer follows {}", args.user_id, args.target_id));
    output.display(&record)
}

pub async fn handle_friends(args: FriendsArgs, service: &GettyService<AnyStore>, output: &OutputManager) -> Result<()> {
    if let Some(target) = args.is_following {
        let answer = settle(service.is_following(&args.user_id, &target).await)?;
        return output.display(&Answer {
            question: format!("{} follows {target}", args.user_id),
            answer,
        });
    }

    let record = settle(service.friends(&args.user_id).await)?;
    output.display(&record)
}

pub async fn handle_audit(user_id: &str, service: &GettyService<AnyStore>, output: &OutputManager) -> Result<()> {
    let issues = settle(service.audit(user_id).await)?;
    if issues.is_empty() {
        output.success(&format!("Every edge touching {user_id} is mirrored"));
        return Ok(());
    }
    output.warning(&format!("{} one-sided edge(s) found", issues.len()));
    output.display(&issues)?;
    output.info(&format!("Run 'getty repair {user_id}' to fix them"));
    Ok(())
}

pub async fn handle_repair(user_id: &str, service: &GettyService<AnyStore>, output: &OutputManager) -> Result<()> {
    let report = settle(service.repair(user_id).await)?;
    output.verbose(&format!(
        "{} follower entries added, {} removed",
        report.added_followers.len(),
        report.removed_followers.len()
    ));
    output.display(&report)
}
