use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Hotspot Pay CLI - admin users, vouchers and maintenance")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a superuser (admin) account
    CreateSuperuser(CreateSuperuserArgs),

    /// Poll the gateways once for every pending transaction
    ///
    /// Expires transactions older than PENDING_TIMEOUT_MINUTES, issues vouchers
    /// for completed payments and retries router pushes that failed earlier.
    CheckTransactions,

    /// Soft-delete expired vouchers and remove their hotspot users
    CleanupVouchers,

    /// Pre-generate vouchers for offline sale and write them to CSV
    GenerateVouchers(GenerateVouchersArgs),

    /// Import transaction charge ranges from CSV
    ///
    /// Expected header: network,min_amount,max_amount,charge
    /// Rows overlapping an existing range on the same network are skipped.
    ImportCharges(ImportChargesArgs),

    /// Log in to a configured router and print its identity
    TestRouter(TestRouterArgs),
}

#[derive(ClapArgs, Debug)]
pub struct CreateSuperuserArgs {
    #[arg(short, long, help = "Username for the superuser")]
    pub username: String,

    #[arg(short, long, help = "Email address for the superuser")]
    pub email: String,

    #[arg(short, long, help = "Password for the superuser")]
    pub password: String,
}

#[derive(ClapArgs, Debug)]
pub struct GenerateVouchersArgs {
    #[arg(short, long, help = "Voucher package id")]
    pub package: i64,

    #[arg(short, long, help = "Number of vouchers to generate")]
    pub count: usize,

    /// Also push each voucher to this router
    #[arg(short, long, help = "Router id to provision the vouchers on")]
    pub router: Option<i64>,

    #[arg(short, long, help = "Output CSV file path")]
    pub out: String,
}

#[derive(ClapArgs, Debug)]
pub struct ImportChargesArgs {
    #[arg(short, long, help = "CSV file with charge ranges")]
    pub file: String,
}

#[derive(ClapArgs, Debug)]
pub struct TestRouterArgs {
    #[arg(short, long, help = "Router id")]
    pub id: i64,
}
