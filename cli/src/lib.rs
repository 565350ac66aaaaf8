mod args;

pub use args::{Args, Commands, CreateSuperuserArgs, GenerateVouchersArgs};
use clap::Parser;
use common::payments::PaymentService;
use common::{Database, ServiceConfig, User};

/// Runs the CLI command parser and executes the selected command.
/// Returns true if a CLI command was handled, false otherwise.
pub async fn run_cli() -> bool {
    let args = Args::parse();
    let Some(command) = args.command else {
        return false;
    };

    let result = match &command {
        Commands::CreateSuperuser(a) => create_superuser(&a.username, &a.email, &a.password).await,
        Commands::CheckTransactions => check_transactions().await,
        Commands::CleanupVouchers => cleanup_vouchers().await,
        Commands::GenerateVouchers(a) => generate_vouchers(a).await,
        Commands::ImportCharges(a) => import_charges(&a.file).await,
        Commands::TestRouter(a) => test_router(a.id).await,
    };
    if let Err(e) = result {
        eprintln!("Command failed: {e:#}");
    }
    true
}

async fn payment_service() -> anyhow::Result<PaymentService> {
    ServiceConfig::from_env()?.create_payment_service().await
}

async fn database() -> anyhow::Result<Database> {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL not set"))?;
    Database::new(&database_url).await
}

/// Creates a superuser: validates input, hashes password, checks for duplicates, and saves to DB.
async fn create_superuser(username: &str, email: &str, password: &str) -> anyhow::Result<()> {
    let user = User::new(username, email, password, true)
        .map_err(|e| anyhow::anyhow!("Validation error: {e}"))?;

    let db = database().await?;
    if db.get_user(username).await?.is_some() {
        return Err(anyhow::anyhow!(
            "A user with username '{}' already exists.",
            username
        ));
    }
    db.save_user(&user)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {e}"))?;

    println!("Superuser '{}' created successfully.", username);
    Ok(())
}

async fn check_transactions() -> anyhow::Result<()> {
    let service = payment_service().await?;
    let summary = service.refresh_open_transactions().await?;
    let synced = service.sync_unsynced_vouchers().await?;
    println!(
        "Checked {} transactions: {} completed, {} failed, {} expired; {} vouchers pushed to routers.",
        summary.checked, summary.completed, summary.failed, summary.expired, synced
    );
    Ok(())
}

async fn cleanup_vouchers() -> anyhow::Result<()> {
    let service = payment_service().await?;
    let removed = service.cleanup_expired_vouchers().await?;
    println!("Soft-deleted {} expired vouchers.", removed);
    Ok(())
}

async fn generate_vouchers(args: &GenerateVouchersArgs) -> anyhow::Result<()> {
    let service = payment_service().await?;
    let vouchers = common::vouchers::generate_batch_csv(
        service.db(),
        args.package,
        args.router,
        args.count,
        &args.out,
    )
    .await?;

    let mut pushed = 0;
    if args.router.is_some() {
        for voucher in &vouchers {
            if service.sync_voucher(voucher).await? {
                pushed += 1;
            }
        }
    }
    println!(
        "Successfully generated {} vouchers to: {} ({} pushed to router)",
        vouchers.len(),
        args.out,
        pushed
    );
    Ok(())
}

async fn import_charges(file: &str) -> anyhow::Result<()> {
    let db = database().await?;
    let imported = common::charges::import_charges_csv(&db, file).await?;
    println!("Imported {} charge ranges from {}.", imported, file);
    Ok(())
}

async fn test_router(id: i64) -> anyhow::Result<()> {
    let service = payment_service().await?;
    let identity = service.test_router(id).await?;
    println!("Router {} is reachable. Identity: {}", id, identity);
    Ok(())
}
