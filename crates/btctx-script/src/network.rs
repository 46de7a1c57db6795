//! Network parameters used for address encoding.
//!
//! The table is immutable and shared: every [`Network`] resolves to a
//! `&'static NetworkParams`.

use std::fmt;
use std::str::FromStr;

use crate::ScriptError;

/// Address-encoding parameters of a single network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkParams {
    /// Canonical network name, e.g. `btc-testnet3`.
    pub name: &'static str,
    /// Base58Check version byte for key-hash addresses.
    pub pubkey_hash_addr_id: u8,
    /// Base58Check version byte for script-hash addresses.
    pub script_hash_addr_id: u8,
    /// Segwit human-readable part. `None` for chains without segwit addresses.
    pub bech32_hrp: Option<&'static str>,
    /// WIF private key prefix.
    pub wif_prefix: u8,
    /// P2P message start bytes, as a little-endian u32.
    pub magic: u32,
}

/// A supported chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Network {
    #[default]
    Bitcoin,
    BitcoinTestnet3,
    BitcoinTestnet4,
    BitcoinRegtest,
    BitcoinSignet,
    Litecoin,
    Dogecoin,
    DogecoinTestnet3,
    Digibyte,
    Qtum,
    Ravencoin,
    BitcoinGold,
    BitcoinGoldTestnet3,
    BitcoinCash,
    BitcoinSv,
    BitcoinSvTestnet3,
}

const MAINNET_WIF: u8 = 0x80;
const TESTNET_WIF: u8 = 0xef;

// Indexed by `Network as usize`.
static PARAMS: [NetworkParams; 16] = [
    NetworkParams { name: "btc", pubkey_hash_addr_id: 0x00, script_hash_addr_id: 0x05, bech32_hrp: Some("bc"), wif_prefix: MAINNET_WIF, magic: 0xd9b4_bef9 },
    NetworkParams { name: "btc-testnet3", pubkey_hash_addr_id: 0x6f, script_hash_addr_id: 0xc4, bech32_hrp: Some("tb"), wif_prefix: TESTNET_WIF, magic: 0x0709_110b },
    NetworkParams { name: "btc-testnet4", pubkey_hash_addr_id: 0x6f, script_hash_addr_id: 0xc4, bech32_hrp: Some("tb"), wif_prefix: TESTNET_WIF, magic: 0x283f_161c },
    NetworkParams { name: "btc-regtest", pubkey_hash_addr_id: 0x6f, script_hash_addr_id: 0xc4, bech32_hrp: Some("bcrt"), wif_prefix: TESTNET_WIF, magic: 0xdab5_bffa },
    NetworkParams { name: "btc-signet", pubkey_hash_addr_id: 0x6f, script_hash_addr_id: 0xc4, bech32_hrp: Some("tb"), wif_prefix: TESTNET_WIF, magic: 0x40cf_030a },
    NetworkParams { name: "ltc", pubkey_hash_addr_id: 48, script_hash_addr_id: 50, bech32_hrp: Some("ltc"), wif_prefix: MAINNET_WIF, magic: 0xdbb6_c0fb },
    NetworkParams { name: "doge", pubkey_hash_addr_id: 30, script_hash_addr_id: 22, bech32_hrp: None, wif_prefix: MAINNET_WIF, magic: 0xc0c0_c0c0 },
    NetworkParams { name: "doge-testnet3", pubkey_hash_addr_id: 113, script_hash_addr_id: 196, bech32_hrp: Some("doget"), wif_prefix: TESTNET_WIF, magic: 0xfcc1_b7dc },
    NetworkParams { name: "dgb", pubkey_hash_addr_id: 30, script_hash_addr_id: 63, bech32_hrp: Some("dgb"), wif_prefix: MAINNET_WIF, magic: 0xdab6_c3fa },
    NetworkParams { name: "qtum", pubkey_hash_addr_id: 58, script_hash_addr_id: 50, bech32_hrp: Some("qc"), wif_prefix: MAINNET_WIF, magic: 0xf1cf_a6d3 },
    NetworkParams { name: "rvn", pubkey_hash_addr_id: 60, script_hash_addr_id: 122, bech32_hrp: None, wif_prefix: MAINNET_WIF, magic: 0x4e56_4152 },
    NetworkParams { name: "btg", pubkey_hash_addr_id: 38, script_hash_addr_id: 23, bech32_hrp: Some("btg"), wif_prefix: MAINNET_WIF, magic: 0x446d_47e1 },
    NetworkParams { name: "btg-testnet3", pubkey_hash_addr_id: 111, script_hash_addr_id: 196, bech32_hrp: Some("btgt"), wif_prefix: TESTNET_WIF, magic: 0x456e_48fd },
    NetworkParams { name: "bch", pubkey_hash_addr_id: 0, script_hash_addr_id: 5, bech32_hrp: None, wif_prefix: MAINNET_WIF, magic: 0xe8f3_e1e3 },
    NetworkParams { name: "bsv", pubkey_hash_addr_id: 0, script_hash_addr_id: 5, bech32_hrp: Some("bsv"), wif_prefix: MAINNET_WIF, magic: 0xe3e1_f3e8 },
    NetworkParams { name: "bsv-testnet3", pubkey_hash_addr_id: 0x6f, script_hash_addr_id: 0xc4, bech32_hrp: Some("bsv"), wif_prefix: TESTNET_WIF, magic: 0xf4e5_f3f4 },
];

impl Network {
    /// Every supported network, in table order.
    pub const ALL: [Network; 16] = [
        Network::Bitcoin,
        Network::BitcoinTestnet3,
        Network::BitcoinTestnet4,
        Network::BitcoinRegtest,
        Network::BitcoinSignet,
        Network::Litecoin,
        Network::Dogecoin,
        Network::DogecoinTestnet3,
        Network::Digibyte,
        Network::Qtum,
        Network::Ravencoin,
        Network::BitcoinGold,
        Network::BitcoinGoldTestnet3,
        Network::BitcoinCash,
        Network::BitcoinSv,
        Network::BitcoinSvTestnet3,
    ];

    pub fn params(&self) -> &'static NetworkParams {
        &PARAMS[*self as usize]
    }

    pub fn name(&self) -> &'static str {
        self.params().name
    }

    /// Segwit HRP, or `UnsupportedNetwork` when the chain has none.
    pub fn bech32_hrp(&self) -> Result<&'static str, ScriptError> {
        self.params()
            .bech32_hrp
            .ok_or_else(|| ScriptError::UnsupportedNetwork(format!("{} has no segwit addresses", self.name())))
    }

    /// Whether this is a test network (testnet, regtest or signet).
    pub fn is_testnet(&self) -> bool {
        self.params().wif_prefix == TESTNET_WIF
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .iter()
            .copied()
            .find(|n| n.name() == s)
            .ok_or_else(|| ScriptError::UnsupportedNetwork(s.to_string()))
    }
}

impl serde::Serialize for Network {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> serde::Deserialize<'de> for Network {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_enum_order() {
        for (i, network) in Network::ALL.iter().enumerate() {
            assert_eq!(*network as usize, i);
            assert_eq!(network.name().parse::<Network>().unwrap(), *network);
        }
    }

    #[test]
    fn test_bitcoin_params() {
        let p = Network::Bitcoin.params();
        assert_eq!(p.pubkey_hash_addr_id, 0x00);
        assert_eq!(p.script_hash_addr_id, 0x05);
        assert_eq!(p.bech32_hrp, Some("bc"));
        assert!(!Network::Bitcoin.is_testnet());
        assert!(Network::BitcoinSignet.is_testnet());
        assert_eq!(Network::BitcoinRegtest.bech32_hrp().unwrap(), "bcrt");
    }

    #[test]
    fn test_chains_without_segwit() {
        assert!(Network::BitcoinCash.bech32_hrp().is_err());
        assert!(Network::Ravencoin.bech32_hrp().is_err());
        assert!(Network::Dogecoin.bech32_hrp().is_err());
    }

    #[test]
    fn test_unknown_name() {
        assert!("btc-mainnet".parse::<Network>().is_err());
        assert_eq!(Network::default(), Network::Bitcoin);
    }

    #[test]
    fn test_serde_as_name() {
        let json = serde_json::to_string(&Network::BitcoinTestnet3).unwrap();
        assert_eq!(json, r#""btc-testnet3""#);
        let back: Network = serde_json::from_str(r#""ltc""#).unwrap();
        assert_eq!(back, Network::Litecoin);
    }
}
