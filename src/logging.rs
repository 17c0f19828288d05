//! Logging to the terminal with colors

use serenity::all::Http;
use std::borrow::Cow;
use std::io::IsTerminal;
use std::sync::{Arc, LazyLock};

const DEFAULT: &str = "\x1b[0m";
const FG_BLUE: &str = "\x1b[38;5;33m";
const FG_CYAN: &str = "\x1b[36m";
const FG_GRAY: &str = "\x1b[90m";
const FG_GREEN: &str = "\x1b[32m";
const FG_MAGENTA: &str = "\x1b[35m";
const FG_RED: &str = "\x1b[31m";
const FG_YELLOW: &str = "\x1b[33m";

pub enum Color {
    Default,
    Event,
    Internal,
    Error,
    User,
    Channel,
    Guild,
    Role,
    Glue,
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Only print colors when printing to a terminal
        //
        // This won't change during the program's execution, so we can cache it.
        static STDOUT_IS_TERMINAL: LazyLock<bool> =
            LazyLock::new(|| std::io::stdout().is_terminal());

        if !*STDOUT_IS_TERMINAL {
            return Ok(());
        }

        write!(
            f,
            "{}",
            match self {
                Color::Default => DEFAULT,
                Color::Event => FG_YELLOW,
                Color::Internal => FG_MAGENTA,
                Color::Error => FG_RED,
                Color::User => FG_GREEN,
                Color::Channel => FG_CYAN,
                Color::Guild => FG_BLUE,
                Color::Role => FG_MAGENTA,
                Color::Glue => FG_GRAY,
            }
        )
    }
}

/// Shared body of the `log_*` macros: a colored marker followed by the formatted message.
#[doc(hidden)]
#[macro_export]
macro_rules! log_line {
    ($print:ident, $marker:literal, $color:expr, $fmtstr:literal $(, $args:expr)* $(,)?) => {{
        $print!(
            concat!("{}", $marker, "{} ", $fmtstr),
            $color,
            $crate::logging::Color::Default
            $(, $args)*
        )
    }};
}

/// Something happened on Discord
#[macro_export]
macro_rules! log_event {
    ($fmtstr:literal $(, $args:expr)* $(,)?) => {
        $crate::log_line!(println, "*", $crate::logging::Color::Event, $fmtstr $(, $args)*)
    };
}

/// The bot itself did something worth noting
#[macro_export]
macro_rules! log_internal {
    ($fmtstr:literal $(, $args:expr)* $(,)?) => {
        $crate::log_line!(println, "+", $crate::logging::Color::Internal, $fmtstr $(, $args)*)
    };
}

/// Something went wrong, but not badly enough to stop the bot
#[macro_export]
macro_rules! log_error {
    ($fmtstr:literal $(, $args:expr)* $(,)?) => {
        $crate::log_line!(eprintln, "!", $crate::logging::Color::Error, $fmtstr $(, $args)*)
    };
}

pub trait PrintColor {
    fn color(&self) -> String;
}

#[serenity::async_trait]
pub trait AsyncPrintColor {
    async fn color(&self, http: &Arc<Http>) -> String;
}

fn paint(color: Color, text: &str) -> String {
    format!("{}{}{}", color, text, Color::Default)
}

// Field separator
pub struct Glue;
impl PrintColor for Glue {
    fn color(&self) -> String {
        paint(Color::Glue, ":")
    }
}

/// A role referred to by name, e.g. a rank or title
pub struct RoleName<'a>(pub &'a str);
impl PrintColor for RoleName<'_> {
    fn color(&self) -> String {
        paint(Color::Role, self.0)
    }
}

impl PrintColor for serenity::all::CurrentUser {
    fn color(&self) -> String {
        paint(Color::User, &self.name)
    }
}

impl PrintColor for serenity::all::User {
    fn color(&self) -> String {
        paint(Color::User, &self.name)
    }
}

impl PrintColor for serenity::all::Member {
    fn color(&self) -> String {
        paint(Color::User, self.display_name())
    }
}

#[serenity::async_trait]
impl AsyncPrintColor for serenity::all::UserId {
    async fn color(&self, http: &Arc<Http>) -> String {
        let name = match self.to_user(http).await {
            Ok(user) => Cow::Owned(user.name),
            Err(_) => Cow::Borrowed("<unknown-user>"),
        };

        paint(Color::User, &name)
    }
}

#[serenity::async_trait]
impl AsyncPrintColor for Option<serenity::all::UserId> {
    async fn color(&self, http: &Arc<Http>) -> String {
        match self {
            Some(user_id) => user_id.color(http).await,
            None => paint(Color::User, "<unknown-user>"),
        }
    }
}

#[serenity::async_trait]
impl AsyncPrintColor for serenity::all::ChannelId {
    async fn color(&self, http: &Arc<Http>) -> String {
        let name = match self.name(http).await {
            Ok(name) => Cow::Owned(name),
            Err(_) => Cow::Borrowed("<unknown-channel>"),
        };

        paint(Color::Channel, &name)
    }
}

#[serenity::async_trait]
impl AsyncPrintColor for Option<serenity::all::ChannelId> {
    async fn color(&self, http: &Arc<Http>) -> String {
        match self {
            Some(channel_id) => channel_id.color(http).await,
            None => paint(Color::Channel, "<unknown-channel>"),
        }
    }
}

#[serenity::async_trait]
impl AsyncPrintColor for serenity::all::GuildId {
    async fn color(&self, http: &Arc<Http>) -> String {
        let name = match self.to_partial_guild(http).await {
            Ok(guild) => Cow::Owned(guild.name),
            Err(_) => Cow::Borrowed("<unknown-guild>"),
        };

        paint(Color::Guild, &name)
    }
}

#[serenity::async_trait]
impl AsyncPrintColor for Option<serenity::all::GuildId> {
    async fn color(&self, http: &Arc<Http>) -> String {
        match self {
            Some(guild_id) => guild_id.color(http).await,
            None => paint(Color::Guild, "<direct-message>"),
        }
    }
}
