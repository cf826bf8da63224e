use galactic_crypto::{Encryptor, HashAlgorithm, HashEncoding, Hasher};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_encryption_recovers_any_text(text in ".{0,64}") {
        let encryptor = Encryptor::new("property-key").unwrap();
        let encoded = encryptor.encrypt_string(&text).unwrap();
        prop_assert_eq!(encryptor.decrypt_string(&encoded).unwrap(), text);
    }

    #[test]
    fn test_hash_is_deterministic(value in ".{0,128}") {
        for hasher in [
            Hasher::new(HashAlgorithm::Sha256),
            Hasher::new(HashAlgorithm::Sha512).with_encoding(HashEncoding::Base64),
        ] {
            let first = hasher.hash_str(&value);
            prop_assert_eq!(&first, &hasher.hash_str(&value));
            prop_assert!(hasher.verify(&value, &first));
        }
    }

    #[test]
    fn test_salted_hash_verifies(value in "[a-zA-Z0-9]{1,32}") {
        let hasher = Hasher::default();
        let salted = hasher.salted_hash(&value);
        prop_assert!(hasher.verify_salted(&value, &salted));
        let mut altered = value.clone();
        altered.push('!');
        prop_assert!(!hasher.verify_salted(&altered, &salted));
    }
}
