mod completion;
mod dump;
mod run;

#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Load and run a program image
    Run(self::run::RunOpt),

    /// Print the words of a program image
    Dump(self::dump::DumpOpt),

    /// Generate shell completions
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Self::Run(opt) => opt.exec(),
            Self::Dump(opt) => opt.exec(),
            Self::Completion(opt) => opt.exec(),
        }
    }
}
