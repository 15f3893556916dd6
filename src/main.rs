//! Zap engine demo.
//!
//! Runs the whole pipeline against the in-memory venue: seed a factory with
//! pairs, sync the registries, estimate a native zap-in, execute it with the
//! estimate as the minimum-out bound, then unwind the position back to a
//! token. `--json` prints the estimates and recorded events as JSON.

use std::path::PathBuf;

use alloy_primitives::{Address, U256};
use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zap_router::estimator::Estimator;
use zap_router::exchange::Exchange;
use zap_router::mocks::MockExchange;
use zap_router::{Zap, ZapConfig};

#[derive(Parser)]
#[command(name = "zap-router", about = "Zap routing engine demo")]
struct Cli {
    /// Engine configuration file; a built-in demo config is used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit estimates and the event log as JSON.
    #[arg(long)]
    json: bool,
}

fn addr(n: u64) -> Address {
    Address::from_word(U256::from(n).into())
}

fn demo_config() -> ZapConfig {
    ZapConfig {
        engine_address: addr(0xe0),
        owner: addr(0xad),
        wrapped_native: addr(0x01),
        auto_sync_page: zap_router::config::AUTO_SYNC_PAGE,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("zap_router=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ZapConfig::load(path)?,
        None => demo_config(),
    };
    config.validate()?;

    let wnative = config.wrapped_native;
    let (usd, gov) = (addr(0x02), addr(0x03));
    let caller = addr(0xca);
    let million = U256::from(1_000_000_000_000u64);

    // seed the venue: three pairs around the wrapped-native hub
    let mut ex = MockExchange::new(wnative);
    let lp_seed = addr(0x99);
    ex.seed_pair(wnative, usd, million, million * U256::from(2), lp_seed)?;
    ex.seed_pair(wnative, gov, million, million / U256::from(4), lp_seed)?;
    let target = ex.seed_pair(usd, gov, million, million / U256::from(8), lp_seed)?;

    let mut zap = Zap::new(&config);
    zap.sync_pools(&ex)?;
    info!(
        pools = ex.all_pairs_length(),
        cursor = ?zap.last_fetched_pair_index(),
        "registries synced"
    );

    // estimate, then execute with the estimate as the floor
    let amount = U256::from(5_000_000_000u64);
    ex.mint_native(caller, amount);
    let estimator = Estimator::new(&zap, &ex);
    let plan = estimator.zap_in_to_lp(wnative, target, amount)?;
    let predicted = estimator.zap_in_shares(target, amount)?;
    info!(
        hub = %plan.intermediate,
        leg0 = %plan.amount0,
        leg1 = %plan.amount1,
        %predicted,
        "zap-in estimated"
    );

    let deadline = ex.timestamp() + 60;
    let shares = zap.zap_in(&mut ex, caller, target, predicted, amount, deadline)?;
    info!(%shares, "zap-in executed at the estimated floor");

    // unwind the whole position into the USD token
    let predicted_out = {
        let estimator = Estimator::new(&zap, &ex);
        estimator.zap_out_amount(target, usd, shares)?
    };
    ex.approve(target, caller, zap.address(), shares)?;
    let out = zap.zap_out(&mut ex, caller, target, shares, usd, predicted_out, deadline)?;
    info!(%out, "position unwound");

    if cli.json {
        let report = serde_json::json!({
            "target_pool": target,
            "amount_in": amount,
            "estimated_shares": predicted,
            "minted_shares": shares,
            "unwound_output": out,
            "events": zap.events(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("zap-in:  {amount} native -> {shares} LP shares of {target}");
        println!("zap-out: {shares} LP shares -> {out} of {usd}");
        println!("engine residue (native): {}", ex.native_balance_of(zap.address()));
    }

    debug_assert_eq!(ex.balance_of(wnative, zap.address()), U256::ZERO);
    Ok(())
}
