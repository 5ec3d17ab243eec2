use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{
    CreditEstimate, CreditRate, CustomerId, LedgerStore, Money, QreSummary, QuickEstimateInput,
    pricing, quick_estimate,
};
use remote::HttpLedgerStore;

#[derive(Parser, Debug)]
#[command(name = "rdcredit_admin")]
#[command(about = "Admin utilities for the R&D credit service (estimates, quotes, stored ledgers)")]
struct Cli {
    /// Federal credit rate as a fraction (also read from `RDCREDIT_CREDIT_RATE`).
    #[arg(long, env = "RDCREDIT_CREDIT_RATE", default_value_t = CreditRate::DEFAULT.fraction())]
    rate: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the public calculator on aggregate figures.
    Estimate(EstimateArgs),
    /// Price a filing for a given credit amount.
    Quote(QuoteArgs),
    /// Summarize a ledger held by the record store.
    Summary(SummaryArgs),
}

#[derive(Args, Debug)]
struct EstimateArgs {
    /// Annual wages, e.g. "$250,000".
    #[arg(long, default_value = "0")]
    wages: Money,
    #[arg(long, default_value_t = 0.0)]
    wage_rd: f64,
    #[arg(long, default_value = "0")]
    contractors: Money,
    #[arg(long, default_value = "0")]
    supplies: Money,
    #[arg(long, default_value_t = 100.0)]
    supply_rd: f64,
    /// Monthly cloud and software spend.
    #[arg(long, default_value = "0")]
    cloud_monthly: Money,
    #[arg(long, default_value_t = 100.0)]
    cloud_rd: f64,
    #[arg(long, default_value_t = 0)]
    years: u32,
}

#[derive(Args, Debug)]
struct QuoteArgs {
    #[arg(long)]
    credit: Money,
    #[arg(long, default_value_t = 0)]
    years: u32,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    /// Record store base URL (also read from `RDCREDIT_STORE_URL`).
    #[arg(long, env = "RDCREDIT_STORE_URL")]
    store_url: String,
    /// Bearer token of the record store.
    #[arg(long, env = "RDCREDIT_STORE_TOKEN")]
    token: Option<String>,
    #[arg(long)]
    email: CustomerId,
    #[arg(long, default_value_t = 0)]
    years: u32,
}

fn print_summary(summary: &QreSummary) {
    println!("Wages:           {:>16}", summary.wages_total.to_string());
    println!("Contractors:     {:>16}", summary.contractors_total.to_string());
    println!("Supplies:        {:>16}", summary.supplies_total.to_string());
    println!("Cloud/software:  {:>16}", summary.cloud_software_total.to_string());
    println!("Total QRE:       {:>16}", summary.grand_total().to_string());
}

fn print_estimate(estimate: &CreditEstimate) {
    println!(
        "Federal credit:  {:>16}  (at {})",
        estimate.federal_credit.to_string(),
        estimate.credit_rate
    );
    print_quote(&estimate.quote);
}

fn print_quote(quote: &pricing::Quote) {
    println!("Tier:            {:>16}", quote.tier.as_str());
    println!("Base price:      {:>16}", quote.base_price.to_string());
    if quote.additional_years > 0 {
        println!(
            "Prior years:     {:>16}  ({} x {})",
            quote.surcharge.to_string(),
            quote.additional_years,
            pricing::ADDITIONAL_YEAR_SURCHARGE
        );
    }
    println!("Price:           {:>16}", quote.total.to_string());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let rate = CreditRate::try_from(cli.rate)?;

    match cli.command {
        Command::Estimate(args) => {
            let input = QuickEstimateInput {
                annual_wages: args.wages,
                wage_rd_percentage: args.wage_rd,
                contractor_costs: args.contractors,
                supply_costs: args.supplies,
                supply_rd_percentage: args.supply_rd,
                monthly_cloud_costs: args.cloud_monthly,
                cloud_rd_percentage: args.cloud_rd,
                additional_years: args.years,
            };
            let result = quick_estimate(&input, rate);
            print_summary(&result.summary);
            print_estimate(&result.estimate);
        }
        Command::Quote(args) => {
            print_quote(&pricing::quote(args.credit, args.years));
        }
        Command::Summary(args) => {
            let store = HttpLedgerStore::new(&args.store_url, args.token)?;
            let Some(ledger) = store.fetch(&args.email).await? else {
                return Err(format!("no ledger stored for {}", args.email).into());
            };
            let summary = engine::summarize(&ledger);
            println!("{} entries for {}", ledger.len(), args.email);
            print_summary(&summary);
            print_estimate(&pricing::estimate(&summary, rate, args.years));
        }
    }

    Ok(())
}
