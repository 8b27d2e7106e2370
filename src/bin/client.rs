use anyhow::{bail, Error};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::Rng;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(name = "tableside")]
#[command(about = "client cli for diners' devices and restaurant staff", version, long_about = None)]
struct Cli {
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    host: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// show the menu of a table
    Menu {
        #[arg(short, long, help = "Table token from the QR code")]
        table: String,
    },
    /// diner side bill ops
    #[command(arg_required_else_help = true)]
    Bill(BillArgs),
    /// staff side ops
    #[command(arg_required_else_help = true)]
    Admin(AdminArgs),
}

#[derive(Debug, Args)]
struct BillArgs {
    #[arg(short, long, help = "Table token from the QR code")]
    table: String,
    #[command(subcommand)]
    command: BillCmds,
}

#[derive(Debug, Subcommand)]
enum BillCmds {
    /// print the open bill
    Show,
    #[command(arg_required_else_help = true)]
    Add {
        #[arg(help = "Menu item to order", value_name = "MENU_ITEM_ID")]
        item: i64,
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..))]
        quantity: i64,
        #[arg(short, long, help = "Diner session, random if absent")]
        session: Option<String>,
    },
    #[command(arg_required_else_help = true)]
    Remove {
        #[arg(help = "Line on the bill to remove", value_name = "LINE_ID")]
        line: i64,
    },
    /// what a payment would charge
    Quote(PayArgs),
    /// pay with the mock provider
    Pay(PayArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Full,
    SplitEven,
    MineOnly,
}

#[derive(Debug, Args)]
struct PayArgs {
    #[arg(short, long, value_enum, default_value_t = Mode::Full)]
    mode: Mode,
    #[arg(short, long, help = "Number of payers for split-even")]
    party_size: Option<u32>,
    #[arg(short, long, help = "Diner session for mine-only, random if absent")]
    session: Option<String>,
    #[arg(long, help = "Tip as a percentage of the amount paid")]
    tip_percent: Option<f64>,
    #[arg(long, help = "Tip as a fixed amount, wins over --tip-percent")]
    custom_tip: Option<f64>,
}

#[derive(Debug, Args)]
struct AdminArgs {
    #[arg(long, env = "ADMIN_TOKEN", default_value = "admin-dev-token")]
    token: String,
    #[command(subcommand)]
    command: AdminCmds,
}

#[derive(Debug, Subcommand)]
enum AdminCmds {
    Dashboard,
    Orders,
    Settings,
    Tables,
}

fn random_session() -> String {
    let mut rng = rand::thread_rng();
    let session: String = (0..8).map(|_| format!("{:x}", rng.gen_range(0..16u8))).collect();
    println!("using session id {}", session);
    session
}

fn payment_body(args: PayArgs) -> Value {
    let (mode, session) = match args.mode {
        Mode::Full => ("full", args.session),
        Mode::SplitEven => ("split_even", args.session),
        Mode::MineOnly => ("mine_only", Some(args.session.unwrap_or_else(random_session))),
    };
    json!({
        "mode": mode,
        "partySize": args.party_size,
        "sessionId": session,
        "tipPercent": args.tip_percent,
        "customTip": args.custom_tip,
    })
}

async fn send(req: RequestBuilder) -> Result<(), Error> {
    let res = req.send().await?;
    let status = res.status();
    let body: Value = res.json().await.unwrap_or(Value::Null);
    match status {
        StatusCode::OK | StatusCode::CREATED => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        StatusCode::UNAUTHORIZED => bail!("admin token rejected"),
        unexpected => bail!(
            "got unexpected status code {}, {} ({})",
            unexpected,
            body["message"].as_str().unwrap_or("no details"),
            body["error"].as_str().unwrap_or("unknown"),
        ),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Cli::parse();
    let client = Client::new();
    let host = args.host.trim_end_matches('/');

    match args.command {
        Commands::Menu { table } => send(client.get(format!("{host}/v1/t/{table}/menu"))).await,
        Commands::Bill(BillArgs { table, command }) => {
            let base = format!("{host}/v1/t/{table}/bill");
            match command {
                BillCmds::Show => send(client.get(base)).await,
                BillCmds::Add { item, quantity, session } => {
                    let session = session.unwrap_or_else(random_session);
                    println!("adding item {} x{} to the bill of table {}", item, quantity, table);
                    send(client.post(format!("{base}/items")).json(&json!({
                        "itemId": item,
                        "quantity": quantity,
                        "sessionId": session,
                    })))
                    .await
                }
                BillCmds::Remove { line } => send(client.delete(format!("{base}/items/{line}"))).await,
                BillCmds::Quote(pay) => send(client.post(format!("{base}/quote")).json(&payment_body(pay))).await,
                BillCmds::Pay(pay) => send(client.post(format!("{base}/pay")).json(&payment_body(pay))).await,
            }
        }
        Commands::Admin(AdminArgs { token, command }) => {
            let path = match command {
                AdminCmds::Dashboard => "dashboard",
                AdminCmds::Orders => "orders",
                AdminCmds::Settings => "settings",
                AdminCmds::Tables => "tables",
            };
            send(client.get(format!("{host}/v1/admin/{path}")).header("X-Admin-Token", token)).await
        }
    }
}
