use crate::commands::{graph, posts, serve};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "serve",
            groups: serve::EXAMPLES,
        },
        CommandExample {
            name: "post",
            groups: posts::POST_EXAMPLES,
        },
        CommandExample {
            name: "like",
            groups: posts::LIKE_EXAMPLES,
        },
        CommandExample {
            name: "feed",
            groups: posts::FEED_EXAMPLES,
        },
        CommandExample {
            name: "follow",
            groups: graph::FOLLOW_EXAMPLES,
        },
        CommandExample {
            name: "repair",
            groups: graph::REPAIR_EXAMPLES,
        },
    ]
}
