//! Known EVM networks and their USDC deployments.
//!
//! Payment terms name their network by its V1 human-readable name
//! (e.g. `"base-sepolia"`). This table resolves the name to an EIP-155 chain
//! id and the USDC token used as the default settlement asset.

use crate::error::UnknownNetworkError;

/// Base Mainnet chain ID.
pub const BASE_MAINNET: u64 = 8453;

/// Base Sepolia (testnet) chain ID.
pub const BASE_SEPOLIA: u64 = 84532;

/// Avalanche C-Chain chain ID.
pub const AVALANCHE_MAINNET: u64 = 43114;

/// Avalanche Fuji (testnet) chain ID.
pub const AVALANCHE_FUJI: u64 = 43113;

/// `IoTeX` Mainnet chain ID.
pub const IOTEX_MAINNET: u64 = 4689;

/// Sei Mainnet chain ID.
pub const SEI_MAINNET: u64 = 1329;

/// Sei Testnet chain ID.
pub const SEI_TESTNET: u64 = 1328;

/// Polygon Mainnet chain ID.
pub const POLYGON_MAINNET: u64 = 137;

/// Polygon Amoy (testnet) chain ID.
pub const POLYGON_AMOY: u64 = 80002;

/// Peaq Mainnet chain ID.
pub const PEAQ_MAINNET: u64 = 3338;

/// Default EIP-712 domain version for USDC.
pub const DEFAULT_USDC_VERSION: &str = "2";

/// A USDC token deployment on one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsdcDeployment {
    /// Token contract address.
    pub address: &'static str,
    /// EIP-712 domain name of the token.
    pub name: &'static str,
}

/// A known network with its chain ID and USDC deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Human-readable V1 network name (e.g. `"base-sepolia"`).
    pub name: &'static str,
    /// EIP-155 chain ID.
    pub chain_id: u64,
    /// Default settlement asset.
    pub usdc: UsdcDeployment,
}

/// All networks the device can quote prices on without an explicit asset.
pub const KNOWN_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "base-sepolia",
        chain_id: BASE_SEPOLIA,
        usdc: UsdcDeployment {
            address: "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
            name: "USDC",
        },
    },
    NetworkInfo {
        name: "base",
        chain_id: BASE_MAINNET,
        usdc: UsdcDeployment {
            address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            name: "USD Coin",
        },
    },
    NetworkInfo {
        name: "avalanche-fuji",
        chain_id: AVALANCHE_FUJI,
        usdc: UsdcDeployment {
            address: "0x5425890298aed601595a70AB815c96711a31Bc65",
            name: "USD Coin",
        },
    },
    NetworkInfo {
        name: "avalanche",
        chain_id: AVALANCHE_MAINNET,
        usdc: UsdcDeployment {
            address: "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E",
            name: "USD Coin",
        },
    },
    NetworkInfo {
        name: "iotex",
        chain_id: IOTEX_MAINNET,
        usdc: UsdcDeployment {
            address: "0xcdf79194c6c285077a58da47641d4dbe51f63542",
            name: "Bridged USDC",
        },
    },
    NetworkInfo {
        name: "sei",
        chain_id: SEI_MAINNET,
        usdc: UsdcDeployment {
            address: "0xe15fc38f6d8c56af07bbcbe3baf5708a2bf42392",
            name: "USDC",
        },
    },
    NetworkInfo {
        name: "sei-testnet",
        chain_id: SEI_TESTNET,
        usdc: UsdcDeployment {
            address: "0x4fcf1784b31630811181f670aea7a7bef803eaed",
            name: "USDC",
        },
    },
    NetworkInfo {
        name: "polygon",
        chain_id: POLYGON_MAINNET,
        usdc: UsdcDeployment {
            address: "0x3c499c542cef5e3811e1192ce70d8cc03d5c3359",
            name: "USD Coin",
        },
    },
    NetworkInfo {
        name: "polygon-amoy",
        chain_id: POLYGON_AMOY,
        usdc: UsdcDeployment {
            address: "0x41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582",
            name: "USDC",
        },
    },
    NetworkInfo {
        name: "peaq",
        chain_id: PEAQ_MAINNET,
        usdc: UsdcDeployment {
            address: "0xbbA60da06c2c5424f03f7434542280FCAd453d10",
            name: "USDC",
        },
    },
];

/// Looks up a known network by its V1 name.
#[must_use]
pub fn network_by_name(name: &str) -> Option<&'static NetworkInfo> {
    KNOWN_NETWORKS.iter().find(|n| n.name == name)
}

/// Looks up the EIP-155 chain ID for a V1 network name.
#[must_use]
pub fn chain_id_by_name(name: &str) -> Option<u64> {
    network_by_name(name).map(|n| n.chain_id)
}

/// Returns the USDC deployment for a V1 network name.
///
/// # Errors
///
/// Returns [`UnknownNetworkError`] if the network is not in [`KNOWN_NETWORKS`].
pub fn usdc_by_name(name: &str) -> Result<&'static UsdcDeployment, UnknownNetworkError> {
    network_by_name(name)
        .map(|n| &n.usdc)
        .ok_or_else(|| UnknownNetworkError(name.to_owned()))
}
