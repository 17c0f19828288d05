use crate::{
    challenge::{experiment::Experiment, riddle::Riddle, Milestone},
    llm::LlmSettings,
    progression::RankTier,
};
use anyhow::{anyhow, Result};
use serenity::all::{ChannelId, GuildId, RoleId};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/labrat/config.toml";

/// Environment variables which take precedence over the secrets in the configuration file.
const DISCORD_TOKEN_ENV: &str = "DISCORD_TOKEN";
const GPT_API_KEY_ENV: &str = "GPT_API_KEY";

/// Bot configuration
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub general: General,
    #[serde(default)]
    pub guild: Guild,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub progression: Progression,
    #[serde(default)]
    pub experiments: Experiments,
    #[serde(default)]
    pub riddles: Riddles,
    #[serde(default)]
    pub titles: Titles,
    #[serde(default)]
    pub llm: Llm,
    #[serde(default)]
    pub news: News,
    #[serde(default)]
    pub music: Music,
    #[serde(default)]
    pub creepy: Creepy,
    #[serde(default)]
    pub welcome: Welcome,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct General {
    #[serde(default)]
    pub discord_token: String,
    #[serde(default)]
    pub bot_owners: Vec<String>,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

/// The one server whose members are ranked, welcomed and waved goodbye to.
#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct Guild {
    pub primary_guild_id: Option<GuildId>,
    /// Role handed to newcomers, removed on their first promotion.
    pub default_role_id: Option<RoleId>,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct Storage {
    pub data_dir: Option<PathBuf>,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Progression {
    pub ranks: Vec<RankTier>,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Experiments {
    pub timeout_secs: u64,
    pub achievements: Vec<Milestone>,
    pub pool: Vec<Experiment>,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Riddles {
    pub answer_timeout_secs: u64,
    pub confirm_timeout_secs: u64,
    pub roles: Vec<Milestone>,
    pub pool: Vec<Riddle>,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Titles {
    pub cooldown_days: u64,
    pub pool: Vec<String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Llm {
    pub chat_url: String,
    pub api_key: Option<String>,
    pub model_name: String,
    pub system: String,
    /// System prompt used to turn down commands the user may not run.
    pub permission_denied_system: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct News {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct Music {
    pub folder: Option<PathBuf>,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Creepy {
    pub channel_id: Option<ChannelId>,
    pub save_folder: PathBuf,
    pub trigger_words: Vec<String>,
    pub messages: Vec<String>,
    pub silence_min_secs: u64,
    pub silence_max_secs: u64,
    pub check_interval_secs: u64,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Welcome {
    pub welcome_channel_id: Option<ChannelId>,
    pub farewell_channel_id: Option<ChannelId>,
    /// Holds `farewell.txt`, `default.png` and the `Avatars` directory.
    pub assets_dir: PathBuf,
}

fn default_command_prefix() -> String {
    ";".to_owned()
}

impl Default for Progression {
    fn default() -> Self {
        let ranks = [
            (1, "Mildly Interesting"),
            (10, "Infinite Curiosity"),
            (25, "Glitch in the Matrix"),
            (50, "Error 404"),
            (95, "Quantum Observer"),
            (100, "Reality Distortion Specialist"),
            (125, "Persistent Error"),
            (150, "Unstable Element"),
            (200, "Time Loop Survivor"),
            (245, "Cosmic Anomaly"),
            (388, "Lab Rat Extraordinaire"),
            (500, "Chaotic Singularity"),
            (608, "Temporal Rift Connoisseur"),
            (783, "Dimension Shifter"),
            (800, "Breaks the Simulation"),
            (900, "Cosmic Archon"),
            (1030, "Anomaly Overlord"),
            (1230, "Infinite Loop"),
            (1500, "Grand Archivist"),
            (2000, "Godlike Algorithm"),
        ];

        Self {
            ranks: ranks
                .into_iter()
                .map(|(messages, role)| RankTier {
                    messages,
                    role: role.to_owned(),
                })
                .collect(),
        }
    }
}

impl Default for Experiments {
    fn default() -> Self {
        use crate::challenge::experiment::ExperimentKind;

        Self {
            timeout_secs: 60,
            achievements: Milestone::list(&[
                (5, "Science Enthusiast"),
                (10, "Lab Veteran"),
                (20, "Mad Scientist"),
            ]),
            pool: vec![
                Experiment {
                    prompt: "Press the button. Any button. This one will do.".to_owned(),
                    kind: ExperimentKind::Reaction {
                        emoji: "\u{1F534}".to_owned(), // red circle
                    },
                },
                Experiment {
                    prompt: "Describe, in no fewer than five words, what the cake tastes like."
                        .to_owned(),
                    kind: ExperimentKind::Message {
                        min_words: Some(5),
                        min_chars: None,
                    },
                },
                Experiment {
                    prompt: "Write a lab report on the companion cube of at least 80 characters."
                        .to_owned(),
                    kind: ExperimentKind::Message {
                        min_words: None,
                        min_chars: Some(80),
                    },
                },
                Experiment {
                    prompt: "Confirm that you are not a robot.".to_owned(),
                    kind: ExperimentKind::Reaction {
                        emoji: "\u{1F916}".to_owned(), // robot face
                    },
                },
            ],
        }
    }
}

impl Default for Riddles {
    fn default() -> Self {
        let pool = [
            (
                "What has keys but can't open locks?",
                &["a piano", "piano", "keyboard", "a keyboard"][..],
            ),
            (
                "The more you take, the more you leave behind. What am I?",
                &["footsteps", "steps"][..],
            ),
            (
                "What can travel around the world while staying in a corner?",
                &["a stamp", "stamp"][..],
            ),
            (
                "What has to be broken before you can use it?",
                &["an egg", "egg"][..],
            ),
            (
                "I speak without a mouth and hear without ears. What am I?",
                &["an echo", "echo"][..],
            ),
        ];

        Self {
            answer_timeout_secs: 60,
            confirm_timeout_secs: 30,
            roles: Milestone::list(&[
                (5, "Riddle Apprentice"),
                (10, "Enigma Solver"),
                (20, "Master of Riddles"),
            ]),
            pool: pool
                .into_iter()
                .map(|(question, answers)| Riddle {
                    question: question.to_owned(),
                    answers: answers.iter().map(|&a| a.to_owned()).collect(),
                })
                .collect(),
        }
    }
}

impl Default for Titles {
    fn default() -> Self {
        let pool = [
            "Test Subject",
            "Cake Connoisseur",
            "Portal Technician",
            "Turret Whisperer",
            "Neurotoxin Sommelier",
            "Aperture Intern",
            "Keeper of the Cube",
            "Senior Button Presser",
        ];

        Self {
            cooldown_days: 7,
            pool: pool.into_iter().map(str::to_owned).collect(),
        }
    }
}

impl Default for Llm {
    fn default() -> Self {
        Self {
            chat_url: "https://api.openai.com/v1/chat/completions".to_owned(),
            api_key: None,
            model_name: "gpt-3.5-turbo".to_owned(),
            system: "You are a polite and helpful assistant.".to_owned(),
            permission_denied_system: "You are a polite butler. The user asked for something \
                                       only the bot owners may do. Decline graciously in one \
                                       sentence."
                .to_owned(),
        }
    }
}

impl Default for News {
    fn default() -> Self {
        Self {
            url: "https://newsapi.org/v2/top-headlines".to_owned(),
            api_key: None,
        }
    }
}

impl Default for Creepy {
    fn default() -> Self {
        let trigger_words = [
            "watching",
            "forgotten",
            "shadow",
            "haunted",
            "alone",
            "glitch",
            "lost",
            "remember",
            "echo",
            "whisper",
            "dark",
            "secret",
            "void",
            "cursed",
            "door",
            "creep",
            "gone",
            "mirror",
            "figure",
            "eyes",
            "behind",
            "silent",
        ];
        let messages = [
            "You should be careful what you say...",
            "I don't think you were supposed to see this again...",
            "Why does this keep coming back?",
            "Did you forget about this?",
            "You're not alone.",
            "Some things don't stay buried.",
            "It was waiting for you.",
            "You posted this before... didn't you?",
            "Are you sure you're alone right now?",
            "This was supposed to be deleted... wasn't it?",
        ];

        Self {
            channel_id: None,
            save_folder: PathBuf::from("./saved_images"),
            trigger_words: trigger_words.into_iter().map(str::to_owned).collect(),
            messages: messages.into_iter().map(str::to_owned).collect(),
            silence_min_secs: 2 * 3600,
            silence_max_secs: 8 * 3600,
            check_interval_secs: 600,
        }
    }
}

impl Default for Welcome {
    fn default() -> Self {
        Self {
            welcome_channel_id: None,
            farewell_channel_id: None,
            assets_dir: PathBuf::from("./welcomedata"),
        }
    }
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut config = Self::parse(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;
        config.apply_env_overrides(|key| std::env::var(key).ok());

        if config.general.discord_token.is_empty() {
            return Err(anyhow!(
                "No Discord token: set `general.discord_token` in `{}` or ${}",
                path.to_string_lossy(),
                DISCORD_TOKEN_ENV
            ));
        }

        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(Into::into)
    }

    /// Secrets from the environment win over the ones in the file.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var(DISCORD_TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.general.discord_token = token;
        }
        if let Some(key) = var(GPT_API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
    }

    pub async fn reload(&mut self) -> Result<()> {
        let new = Self::load().await?;
        *self = new;
        Ok(())
    }
}

impl Storage {
    /// Where the JSON documents live.  Falls back to the platform data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|p| p.join("labrat"))
                .ok_or(anyhow!("Could not find data directory")),
        }
    }
}

impl Llm {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

impl<'a> Llm {
    pub fn as_llm_settings(&'a self) -> LlmSettings<'a> {
        LlmSettings {
            model_name: &self.model_name,
            system: &self.system,
        }
    }

    pub fn as_permission_denied_settings(&'a self) -> LlmSettings<'a> {
        LlmSettings {
            model_name: &self.model_name,
            system: &self.permission_denied_system,
        }
    }
}

impl Welcome {
    pub fn farewell_file(&self) -> PathBuf {
        self.assets_dir.join("farewell.txt")
    }

    pub fn default_avatar(&self) -> PathBuf {
        self.assets_dir.join("default.png")
    }

    pub fn avatars_dir(&self) -> PathBuf {
        self.assets_dir.join("Avatars")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::experiment::ExperimentKind;

    #[test]
    fn minimal_config_fills_in_defaults() {
        let cfg = Config::parse(
            r#"
            [general]
            discord_token = "abc"
            bot_owners = ["paradigm"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.general.command_prefix, ";");
        assert_eq!(cfg.progression.ranks.len(), 20);
        assert_eq!(cfg.titles.cooldown_days, 7);
        assert_eq!(cfg.experiments.achievements[0].name, "Science Enthusiast");
        assert!(!cfg.llm.is_configured());
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = Config::parse(
            r#"
            [general]
            command_prefix = "!"

            [guild]
            primary_guild_id = "938304756185710642"

            [[progression.ranks]]
            messages = 3
            role = "Newcomer"

            [experiments]
            timeout_secs = 5
            achievements = [{ count = 1, name = "First Steps" }]

            [[experiments.pool]]
            prompt = "Say something long"
            kind = "message"
            min_words = 3

            [[experiments.pool]]
            prompt = "Click"
            kind = "reaction"
            emoji = "✅"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.general.command_prefix, "!");
        assert_eq!(
            cfg.guild.primary_guild_id,
            Some(GuildId::new(938304756185710642))
        );
        assert_eq!(cfg.progression.ranks.len(), 1);
        assert_eq!(cfg.experiments.timeout_secs, 5);
        assert!(matches!(
            cfg.experiments.pool[0].kind,
            ExperimentKind::Message {
                min_words: Some(3),
                min_chars: None
            }
        ));
        assert!(matches!(
            &cfg.experiments.pool[1].kind,
            ExperimentKind::Reaction { emoji } if emoji == "✅"
        ));
    }

    #[test]
    fn environment_secrets_win() {
        let mut cfg = Config::parse("[general]\ndiscord_token = \"from-file\"\n").unwrap();
        cfg.apply_env_overrides(|key| match key {
            DISCORD_TOKEN_ENV => Some("from-env".to_owned()),
            GPT_API_KEY_ENV => Some("sk-test".to_owned()),
            _ => None,
        });

        assert_eq!(cfg.general.discord_token, "from-env");
        assert!(cfg.llm.is_configured());
    }

    #[test]
    fn empty_environment_keeps_file_values() {
        let mut cfg = Config::parse("[general]\ndiscord_token = \"from-file\"\n").unwrap();
        cfg.apply_env_overrides(|_| Some(String::new()));

        assert_eq!(cfg.general.discord_token, "from-file");
        assert!(cfg.llm.api_key.is_none());
    }
}
