mod convert;
mod palette;
mod posterize;
mod utils;

use crate::cli::{Cli, Commands};
use chromatrace::ChromatraceResult;

pub fn run(Cli { global, command }: Cli) -> ChromatraceResult<()> {
    match command {
        Commands::Convert(cmd) => convert::run(&global, cmd),
        Commands::Posterize(cmd) => posterize::run(&global, cmd),
        Commands::Palette(cmd) => palette::run(&global, cmd),
    }
}
