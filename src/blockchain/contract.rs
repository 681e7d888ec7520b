//! ABI of the strike contract.
//!
//! Only the entry point the issuer invokes is bound; its execution logic is
//! opaque to the agent.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    /// Flash-arbitrage entry point on the strike contract.
    #[derive(Debug)]
    function executeFlashArbitrage(address tokenA, address tokenOut, uint256 amount) external;
}

/// Calldata for `executeFlashArbitrage(tokenA, tokenOut, amount)`.
pub fn encode_strike_call(token_a: Address, token_out: Address, amount: U256) -> Bytes {
    let call = executeFlashArbitrageCall {
        tokenA: token_a,
        tokenOut: token_out,
        amount,
    };
    Bytes::from(call.abi_encode())
}
