//! Constant-product fee math shared by the router mock, the orchestrator and
//! the estimator.
//!
//! Everything here must stay bit-identical between estimation and execution:
//! the estimator's predicted amounts are only usable as `minimumOut` bounds
//! because both sides run through these exact functions.

use alloy_primitives::U256;

/// Swap fee: 0.3%, expressed as amountInWithFee = amountIn * 997 / 1000.
pub const FEE_NUMERATOR: u64 = 997;
pub const FEE_DENOMINATOR: u64 = 1000;

/// Shares burned forever on a pair's first mint.
pub const MINIMUM_LIQUIDITY: u64 = 1000;

/// Output of a single constant-product hop with the 0.3% fee:
/// amountOut = (amountIn * 997 * reserveOut) / (reserveIn * 1000 + amountIn * 997)
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::ZERO;
    }
    let amount_in_with_fee = amount_in * U256::from(FEE_NUMERATOR);
    let numerator = amount_in_with_fee * reserve_out;
    let denominator = reserve_in * U256::from(FEE_DENOMINATOR) + amount_in_with_fee;
    numerator / denominator
}

/// Fee-less proportional quote: amountB = amountA * reserveB / reserveA.
pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> U256 {
    if reserve_a.is_zero() {
        return U256::ZERO;
    }
    amount_a * reserve_b / reserve_a
}

/// Portion of a single-sided deposit to swap to the other constituent so the
/// two legs match the pool's reserve ratio after the swap, accounting for the
/// 0.3% fee:
///
///   s = (sqrt(r * (r * 3988009 + a * 3988000)) - r * 1997) / 1994
///
/// where `a` is the held amount and `r` the reserve of the held token.
pub fn optimal_swap_in(amount_in: U256, reserve_in: U256) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() {
        return U256::ZERO;
    }
    let r = reserve_in;
    let radicand = r * (r * U256::from(3_988_009u64) + amount_in * U256::from(3_988_000u64));
    let root = radicand.root(2);
    let scaled = r * U256::from(1997u64);
    if root <= scaled {
        return U256::ZERO;
    }
    (root - scaled) / U256::from(1994u64)
}

/// Desired-amount trim performed by the router's addLiquidity: keep one side
/// whole and shrink the other to the proportional quote.
pub fn optimal_add_amounts(
    amount_a_desired: U256,
    amount_b_desired: U256,
    reserve_a: U256,
    reserve_b: U256,
) -> (U256, U256) {
    if reserve_a.is_zero() && reserve_b.is_zero() {
        return (amount_a_desired, amount_b_desired);
    }
    let amount_b_optimal = quote(amount_a_desired, reserve_a, reserve_b);
    if amount_b_optimal <= amount_b_desired {
        (amount_a_desired, amount_b_optimal)
    } else {
        (quote(amount_b_desired, reserve_b, reserve_a), amount_b_desired)
    }
}

/// LP shares minted for a deposit of (amount0, amount1) against the current
/// reserves and share supply. First mint burns MINIMUM_LIQUIDITY.
pub fn liquidity_minted(
    amount0: U256,
    amount1: U256,
    reserve0: U256,
    reserve1: U256,
    total_supply: U256,
) -> U256 {
    if total_supply.is_zero() {
        let minted = (amount0 * amount1).root(2);
        minted.saturating_sub(U256::from(MINIMUM_LIQUIDITY))
    } else {
        let by0 = amount0 * total_supply / reserve0;
        let by1 = amount1 * total_supply / reserve1;
        by0.min(by1)
    }
}

/// Constituent amounts paid out when burning `liquidity` shares.
pub fn remove_amounts(
    liquidity: U256,
    reserve0: U256,
    reserve1: U256,
    total_supply: U256,
) -> (U256, U256) {
    if total_supply.is_zero() {
        return (U256::ZERO, U256::ZERO);
    }
    (
        liquidity * reserve0 / total_supply,
        liquidity * reserve1 / total_supply,
    )
}
