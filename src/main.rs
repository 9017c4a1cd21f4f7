use clap::{Parser, Subcommand};
use pintop::{Action, run_app, send_action};

#[derive(Parser)]
#[command(name = "pintop", about = "Pin live always-on-top mirrors of macOS windows")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the mirror engine in the foreground.
    Launch {
        #[arg(short, long)]
        config: Option<String>,
    },
    #[command(flatten)]
    Action(Action),
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        None => run_app(None),
        Some(Command::Launch { config }) => run_app(config),
        Some(Command::Action(action)) => match send_action(&action) {
            Ok(response) => {
                println!("{response}");
                return;
            }
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        },
    };
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
