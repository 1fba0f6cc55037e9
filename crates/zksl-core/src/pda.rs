//! Program-derived address derivations shared by submitter and indexer.

use solana_sdk::pubkey::Pubkey;

const NAMESPACE: &[u8] = b"zksl";

pub fn config_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[NAMESPACE, b"config"], program_id).0
}

pub fn aggregator_state_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[NAMESPACE, b"aggregator"], program_id).0
}

pub fn range_state_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[NAMESPACE, b"range"], program_id).0
}

pub fn proof_record_address(program_id: &Pubkey, proof_hash: &[u8; 32], seq: u64) -> Pubkey {
    Pubkey::find_program_address(
        &[NAMESPACE, b"proof", proof_hash, &seq.to_le_bytes()],
        program_id,
    )
    .0
}

pub fn validator_record_address(program_id: &Pubkey, validator: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[NAMESPACE, b"validator", validator.as_ref()], program_id).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivations_are_deterministic_and_distinct() {
        let program = Pubkey::new_from_array([9; 32]);
        let config = config_address(&program);
        assert_eq!(config, config_address(&program));

        let all = [
            config,
            aggregator_state_address(&program),
            range_state_address(&program),
            proof_record_address(&program, &[1; 32], 1),
            validator_record_address(&program, &Pubkey::new_from_array([2; 32])),
        ];
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn proof_record_address_binds_hash_and_seq() {
        let program = Pubkey::new_from_array([9; 32]);
        let base = proof_record_address(&program, &[1; 32], 1);
        assert_ne!(base, proof_record_address(&program, &[1; 32], 2));
        assert_ne!(base, proof_record_address(&program, &[2; 32], 1));
    }
}
