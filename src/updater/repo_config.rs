use serde::Deserialize;
use std::path::PathBuf;

fn default_verify_ssl() -> VerifySsl { VerifySsl::Enabled(true) }

/// One source repository and the bots that consume it.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoCfg {
    /// Local working copy path
    pub directory: PathBuf,
    /// Remote to clone from when `directory` does not exist yet
    pub url: Option<String>,
    /// Branch to check out on the initial clone (remote default otherwise)
    pub branch: Option<String>,
    /// Rules applied to every bot of this repository
    #[serde(default)]
    pub files: Vec<FileRule>,
    pub bots: Vec<BotCfg>,
}

/// A deployment that receives files from its repository.
#[derive(Debug, Clone, Deserialize)]
pub struct BotCfg {
    pub name: String,
    /// Destination root for propagated files
    pub directory: PathBuf,
    /// Rules applied after the repository-level ones
    #[serde(default)]
    pub files: Vec<FileRule>,
    /// Overrides the process-wide reload endpoint
    pub api: Option<ApiCfg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileRule {
    pub file_src: PathBuf,
    pub file_dst: Option<PathBuf>,
}

/// Management endpoint of a running bot.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCfg {
    pub address: String,
    pub user: String,
    pub pass: String,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: VerifySsl,
}

/// Certificate policy: a plain switch or a PEM bundle of extra roots.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VerifySsl {
    Enabled(bool),
    CaBundle(PathBuf),
}

impl FileRule {
    pub fn new(file_src: impl Into<PathBuf>, file_dst: Option<&str>) -> Self {
        Self {
            file_src: file_src.into(),
            file_dst: file_dst.map(PathBuf::from),
        }
    }
}

impl RepoCfg {
    /// Rules for one bot in application order: repository rules first.
    pub fn rules_for<'a>(&'a self, bot: &'a BotCfg) -> impl Iterator<Item = &'a FileRule> {
        self.files.iter().chain(bot.files.iter())
    }
}
