//! CLI front end: reads a Bril program, runs the requested optimization
//! passes over it in order, and prints the optimized program as JSON.

use bril_lvn::error::BrilError;
use bril_lvn::json;
use bril_lvn::passes::{Pass, PassManager};
use clap::Parser;
use std::path::PathBuf;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

#[derive(Parser, Debug)]
#[command(name = "brilopt", about = "Local value numbering and TDCE for Bril")]
struct Cli {
    /// List available passes and exit.
    #[arg(long)]
    list: bool,

    /// Path to a `.json` or `.bril` Bril program.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Passes to run, in order. With none given, the program is emitted
    /// unchanged (the identity pipeline).
    #[arg(long, num_args = 1..)]
    passes: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter)]
enum PassName {
    Tdce,
    Lvn,
    LvnOnly,
    LvnConst,
}

impl PassName {
    fn as_str(self) -> &'static str {
        match self {
            PassName::Tdce => "tdce",
            PassName::Lvn => "lvn",
            PassName::LvnOnly => "lvn-only",
            PassName::LvnConst => "lvn-const",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        PassName::iter().find(|p| p.as_str() == s)
    }

    fn build(self) -> PassManager {
        match self {
            PassName::Tdce => PassManager::tdce(),
            PassName::Lvn => PassManager::lvn(),
            PassName::LvnOnly => PassManager::lvn_only(),
            PassName::LvnConst => PassManager::lvn_const(),
        }
    }
}

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    if cli.list {
        for name in PassName::iter() {
            println!("{}", name.as_str());
        }
        return 0;
    }

    let Some(source) = cli.source else {
        eprintln!("--source is required unless --list is given");
        return 1;
    };

    let mut module = match json::read_program(&source) {
        Ok(module) => module,
        Err(e) => return report(e),
    };

    // With no `--passes`, the identity pipeline applies: read and re-emit
    // the program unchanged.
    for name in cli.passes {
        let Some(pass_name) = PassName::from_str(&name) else {
            return report(BrilError::UnknownPass(name));
        };
        let mut manager = pass_name.build();
        if let Err(e) = manager.run(&mut module) {
            return report(e);
        }
    }

    let output = json::dump_module(&module);
    println!(
        "{}",
        serde_json::to_string_pretty(&output).expect("Value serialization cannot fail")
    );
    0
}

fn report(err: BrilError) -> i32 {
    eprintln!("{err}");
    match err {
        BrilError::IRInvariantViolation(_) => 2,
        BrilError::InputNotFound(_) | BrilError::ParseError(_) | BrilError::UnknownPass(_) => 1,
    }
}
