use proptest::prelude::*;

use btctx_primitives::chainhash::Hash;
use btctx_primitives::ec::private_key::{PrivateKey, TESTNET_WIF_PREFIX};
use btctx_primitives::hash::sha256;
use btctx_primitives::schnorr::{self, tweak_private_key, tweak_public_key, XOnlyPublicKey};
use btctx_primitives::util::{ByteReader, VarInt};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn wif_roundtrip(seed in prop::array::uniform32(any::<u8>())) {
        // Not every 32-byte array is a valid scalar.
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let wif = pk.to_wif(TESTNET_WIF_PREFIX);
            let (pk2, prefix) = PrivateKey::from_wif(&wif).unwrap();
            prop_assert_eq!(pk.to_hex(), pk2.to_hex());
            prop_assert_eq!(prefix, TESTNET_WIF_PREFIX);
        }
    }

    #[test]
    fn ecdsa_sign_verify(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let digest = sha256(&msg);
            let sig = pk.sign(&digest).unwrap();
            prop_assert!(sig.is_low_s());
            prop_assert!(pk.pub_key().verify(&digest, &sig));
        }
    }

    #[test]
    fn taproot_tweak_keys_agree(seed in prop::array::uniform32(any::<u8>()), digest in prop::array::uniform32(any::<u8>())) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let internal = XOnlyPublicKey::from(&pk.pub_key());
            let (output, _) = tweak_public_key(&internal, None).unwrap();
            let tweaked = tweak_private_key(&pk, None).unwrap();
            let sig = schnorr::sign(&tweaked, &digest).unwrap();
            prop_assert!(output.verify(&digest, &sig));
        }
    }

    #[test]
    fn hash_hex_roundtrip(bytes in prop::array::uniform32(any::<u8>())) {
        let hash = Hash::new(bytes);
        let hash2 = Hash::from_hex(&hash.to_string()).unwrap();
        prop_assert_eq!(hash, hash2);
    }

    #[test]
    fn varint_reads_back(v in any::<u64>()) {
        let bytes = VarInt(v).to_bytes();
        prop_assert_eq!(bytes.len(), VarInt(v).length());
        let mut reader = ByteReader::new(&bytes);
        prop_assert_eq!(reader.read_varint().unwrap(), VarInt(v));
        prop_assert_eq!(reader.remaining(), 0);
    }
}
