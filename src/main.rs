use clap::{Args, Parser, Subcommand, ValueEnum};
use homeloan::config::AppConfig;
use homeloan::core::{Applicant, ApplicantFlags, PropertyCategory, RuleBook, simulate};
use homeloan::error::AppError;
use homeloan::{api, telemetry};

#[derive(Parser, Debug)]
#[command(
    name = "homeloan",
    about = "Housing credit eligibility and affordability simulator",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one simulation and print the JSON outcome
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCategory {
    New,
    Used,
}

impl From<CliCategory> for PropertyCategory {
    fn from(value: CliCategory) -> Self {
        match value {
            CliCategory::New => PropertyCategory::New,
            CliCategory::Used => PropertyCategory::Used,
        }
    }
}

#[derive(Args, Debug)]
struct SimulateArgs {
    #[arg(long, help = "Property price")]
    price: f64,
    #[arg(long, help = "Gross monthly household income")]
    income: f64,
    #[arg(long, value_enum)]
    category: CliCategory,
    #[arg(long, help = "Applicant age in completed years")]
    age: u32,
    #[arg(long, help = "Applicant holds a restricted savings account")]
    savings_account: bool,
    #[arg(long, help = "Applicant already received a housing subsidy")]
    previous_subsidy: bool,
    #[arg(long)]
    co_borrower: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    let mut config = AppConfig::load()?;
    match command {
        Command::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            telemetry::init(&config.telemetry)?;
            api::run_http_server(config).await
        }
        Command::Simulate(args) => {
            let applicant = Applicant::new(
                args.income,
                args.price,
                args.category.into(),
                args.age,
                ApplicantFlags {
                    has_savings_account: args.savings_account,
                    previous_subsidy: args.previous_subsidy,
                    has_co_borrower: args.co_borrower,
                },
            )?;
            let rules = RuleBook::reference()
                .with_min_financed_fraction(config.engine.min_financed_fraction);
            let outcome = simulate(&rules, &applicant);
            let rendered = serde_json::to_string_pretty(&outcome)?;
            println!("{rendered}");
            Ok(())
        }
    }
}
