//! Wallet management and transaction signing.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized
//! - Nonces are not tracked here; see `account::NonceCursor`

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "TREASURY_PRIVATE_KEY";

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub hash: TxHash,
    /// EIP-2718 encoding, as sent with `eth_sendRawTransaction`.
    pub raw: Bytes,
}

/// Wallet for transaction signing.
#[derive(Debug, Clone)]
pub struct Wallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Network wallet used to fill in signatures on built requests.
    network_wallet: EthereumWallet,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Parse a hex private key, tolerating surrounding quotes, whitespace
    /// and a `0x` prefix as they commonly appear in `.env` files.
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let cleaned = private_key_hex.trim().replace(['\'', '"'], "");
        let key_hex = cleaned.strip_prefix("0x").unwrap_or(&cleaned);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet initialized"
        );

        let network_wallet = EthereumWallet::from(signer.clone());
        Ok(Self {
            signer,
            network_wallet,
            chain_id,
        })
    }

    /// Load the treasury key from `TREASURY_PRIVATE_KEY`.
    pub fn from_env(chain_id: u64) -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key, chain_id)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a fully populated request.
    ///
    /// The request must already carry nonce, gas limit and fee fields; the
    /// chain id is filled in from the wallet.
    pub async fn sign(&self, request: TransactionRequest) -> BlockchainResult<SignedTransaction> {
        let request = request
            .with_from(self.address())
            .with_chain_id(self.chain_id);
        let envelope: TxEnvelope = request
            .build(&self.network_wallet)
            .await
            .map_err(|e| BlockchainError::Signing(e.to_string()))?;

        Ok(SignedTransaction {
            hash: *envelope.tx_hash(),
            raw: Bytes::from(envelope.encoded_2718()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::consensus::Transaction as _;
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::U256;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 8453).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert_eq!(wallet.chain_id(), 8453);
    }

    #[test]
    fn test_wallet_with_quotes_and_prefix() {
        let wallet =
            Wallet::from_private_key(&format!(" \"0x{}\" ", TEST_PRIVATE_KEY), 8453).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_private_key() {
        let result = Wallet::from_private_key("invalid_key", 1);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[tokio::test]
    async fn test_sign_eip1559_request() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 8453).unwrap();
        let request = TransactionRequest::default()
            .with_to(Address::repeat_byte(0x11))
            .with_value(U256::from(1_000u64))
            .with_nonce(7)
            .with_gas_limit(21_000)
            .with_max_fee_per_gas(2_000_000_000)
            .with_max_priority_fee_per_gas(1_000_000_000);

        let signed = wallet.sign(request).await.unwrap();
        let decoded = TxEnvelope::decode_2718(&mut signed.raw.as_ref()).unwrap();

        assert_eq!(*decoded.tx_hash(), signed.hash);
        assert_eq!(decoded.nonce(), 7);
        assert_eq!(decoded.chain_id(), Some(8453));
        assert!(decoded.is_eip1559());
    }
}
