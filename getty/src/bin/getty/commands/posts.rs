use anyhow::{Result, bail};
use chrono::Utc;
use clap::Args;

use getty::{AnyStore, FeedPolicy, GettyService, ImageSource, PostDraft, PostImage};

use crate::commands::settle;
use crate::examples::ExampleGroup;
use crate::output::{Answer, OutputManager};

pub const POST_EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Publish",
        commands: &[
            "getty post alice --prompt \"a fox in the snow\" --image-url https://img/1.png",
            "getty post alice --date 2024_01_05 --prompt \"retro\" --image-b64 aGVsbG8=   # Backfill a day",
        ],
    },
    ExampleGroup {
        title: "Read",
        commands: &[
            "getty show alice 2024_01_05          # One post",
            "getty posts alice                    # Every post, oldest first",
        ],
    },
];

pub const LIKE_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Likes",
    commands: &[
        "getty like alice 2024_01_05 --by bob           # bob likes alice's post",
        "getty like alice 2024_01_05 --by bob --check   # Does bob like it?",
        "getty unlike alice 2024_01_05 --by bob",
    ],
}];

pub const FEED_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Home Feed",
    commands: &[
        "getty feed bob                       # Posts of everyone bob follows",
        "getty feed bob --include-own         # Bob's own posts first",
        "getty feed bob --policy best-effort  # Skip users whose posts cannot be read",
    ],
}];

#[derive(Args)]
pub struct PostArgs {
    /// Author of the post
    pub user_id: String,

    /// Day to post for (<year>_<month>_<day>); defaults to today
    #[arg(long)]
    pub date: Option<String>,

    /// Prompt the image was generated from
    #[arg(long, default_value = "")]
    pub prompt: String,

    /// Daily prompt the user answered
    #[arg(long)]
    pub given_prompt: Option<String>,

    /// Image URL
    #[arg(long, conflicts_with = "image_b64")]
    pub image_url: Option<String>,

    /// Base64 image payload
    #[arg(long)]
    pub image_b64: Option<String>,

    /// Unix timestamp of the image; defaults to now
    #[arg(long)]
    pub created: Option<i64>,
}

#[derive(Args)]
pub struct PostRef {
    /// Owner of the post
    pub user_id: String,

    /// Day key of the post
    pub post_id: String,
}

#[derive(Args)]
pub struct LikeArgs {
    #[command(flatten)]
    pub post: PostRef,

    /// User liking the post
    #[arg(long = "by")]
    pub liker_id: String,

    /// Only report whether the user likes the post
    #[arg(long)]
    pub check: bool,
}

#[derive(Args)]
pub struct CommentArgs {
    #[command(flatten)]
    pub post: PostRef,

    /// Comment text
    pub text: String,

    /// Author of the comment
    #[arg(long = "by")]
    pub author_id: String,

    /// Display name stored with the comment; defaults to the author id
    #[arg(long)]
    pub username: Option<String>,
}

#[derive(Args)]
pub struct FeedArgs {
    /// User whose home feed to build
    pub user_id: String,

    /// Put the user's own posts first
    #[arg(long)]
    pub include_own: bool,

    /// What to do when one followed user's posts cannot be read
    #[arg(long, value_enum)]
    pub policy: Option<FeedPolicy>,
}

pub async fn handle_post(args: PostArgs, service: &GettyService<AnyStore>, output: &OutputManager) -> Result<()> {
    let source = match (args.image_url, args.image_b64) {
        (Some(url), _) => ImageSource::Url { url },
        (None, Some(b64)) => ImageSource::B64 { b64 },
        (None, None) => bail!("one of --image-url or --image-b64 is required"),
    };
    let draft = PostDraft {
        user_prompt: args.prompt,
        given_prompt: args.given_prompt,
        image: Some(PostImage {
            created: args.created.unwrap_or_else(|| Utc::now().timestamp()),
            source,
        }),
    };
    let post = settle(service.create_post(&args.user_id, args.date.as_deref(), draft).await)?;
    output.success(&format!("Stored post {}/{}", post.user_id, post.date_key));
    output.display(&post)
}

pub async fn handle_show(args: PostRef, service: &GettyService<AnyStore>, output: &OutputManager) -> Result<()> {
    match settle(service.get_post(&args.user_id, &args.post_id).await)? {
        Some(post) => output.display(&post),
        None => {
            output.warning(&format!("{} has no post for {}", args.user_id, args.post_id));
            Ok(())
        }
    }
}

pub async fn handle_posts(user_id: &str, service: &GettyService<AnyStore>, output: &OutputManager) -> Result<()> {
    let posts = settle(service.get_all_posts(user_id).await)?;
    output.display(&posts)
}

pub async fn handle_like(
    args: LikeArgs,
    liked: bool,
    service: &GettyService<AnyStore>,
    output: &OutputManager,
) -> Result<()> {
    let PostRef { user_id, post_id } = &args.post;
    if args.check {
        let answer = settle(service.user_likes_post(user_id, post_id, &args.liker_id).await)?;
        return output.display(&Answer {
            question: format!("{} likes {user_id}/{post_id}", args.liker_id),
            answer,
        });
    }

    let envelope = if liked {
        service.like_post(user_id, post_id, &args.liker_id).await
    } else {
        service.unlike_post(user_id, post_id, &args.liker_id).await
    };
    let post = settle(envelope)?;
    output.success(&format!(
        "{} {} {user_id}/{post_id}",
        args.liker_id,
        if liked { "likes" } else { "no longer likes" }
    ));
    output.display(&post)
}

pub async fn handle_comment(args: CommentArgs, service: &GettyService<AnyStore>, output: &OutputManager) -> Result<()> {
    let username = args.username.as_deref().unwrap_or(&args.author_id);
    let post = settle(
        service
            .add_comment(&args.post.user_id, &args.post.post_id, &args.author_id, username, &args.text)
            .await,
    )?;
    output.success(&format!("Comment added to {}/{}", post.user_id, post.date_key));
    output.display(&post)
}

pub async fn handle_feed(args: FeedArgs, service: &GettyService<AnyStore>, output: &OutputManager) -> Result<()> {
    let feed = settle(service.home_feed(&args.user_id).await)?;
    output.display(&feed)?;
    if !feed.skipped.is_empty() {
        output.warning(&format!("{} followed user(s) left out:", feed.skipped.len()));
        for failure in &feed.skipped {
            output.bullet(&format!("{}: {}", failure.user_id, failure.message));
        }
    }
    Ok(())
}
