//! Domain-separated commitment preimage and digest.
//!
//! The verifier program recomputes this byte string instruction-side and
//! rejects any submission whose Ed25519 message differs, so the layout is
//! bit-exact: prefix, chain id, program id, proof hash, slot range, seq.

use solana_sdk::pubkey::Pubkey;

/// ASCII domain-separation prefix, 14 bytes. A future v2 layout must bump
/// the version suffix to avoid cross-version replay.
pub const DS_PREFIX: &[u8; 14] = b"zKSL/anchor/v1";

/// Fixed preimage length: 14 + 8 + 32 + 32 + 8 + 8 + 8.
pub const DS_MESSAGE_LEN: usize = 110;

/// Build the 110-byte commitment preimage.
pub fn commitment_preimage(
    chain_id: u64,
    program_id: &Pubkey,
    proof_hash: &[u8; 32],
    start_slot: u64,
    end_slot: u64,
    seq: u64,
) -> [u8; DS_MESSAGE_LEN] {
    let mut ds = [0u8; DS_MESSAGE_LEN];
    ds[..14].copy_from_slice(DS_PREFIX);
    ds[14..22].copy_from_slice(&chain_id.to_le_bytes());
    ds[22..54].copy_from_slice(program_id.as_ref());
    ds[54..86].copy_from_slice(proof_hash);
    ds[86..94].copy_from_slice(&start_slot.to_le_bytes());
    ds[94..102].copy_from_slice(&end_slot.to_le_bytes());
    ds[102..110].copy_from_slice(&seq.to_le_bytes());
    ds
}

/// BLAKE3 digest of the preimage.
pub fn commitment_digest(preimage: &[u8; DS_MESSAGE_LEN]) -> [u8; 32] {
    *blake3::hash(preimage).as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn preimage_layout_known_answer() {
        // chain_id 1, zero program id, zero proof hash, slots 1..=1, seq 1.
        let ds = commitment_preimage(1, &Pubkey::default(), &[0u8; 32], 1, 1, 1);
        assert_eq!(ds.len(), DS_MESSAGE_LEN);
        assert_eq!(&ds[..14], DS_PREFIX);
        assert_eq!(&ds[14..22], &1u64.to_le_bytes());
        assert_eq!(&ds[22..86], &[0u8; 64][..]);
        assert_eq!(&ds[86..94], &1u64.to_le_bytes());
        assert_eq!(&ds[94..102], &1u64.to_le_bytes());
        assert_eq!(&ds[102..110], &1u64.to_le_bytes());

        // The digest of this exact preimage must never drift across builds.
        let again = commitment_preimage(1, &Pubkey::default(), &[0u8; 32], 1, 1, 1);
        assert_eq!(commitment_digest(&ds), commitment_digest(&again));
    }

    #[test]
    fn chain_id_changes_the_digest() {
        let base = commitment_preimage(1, &Pubkey::default(), &[0u8; 32], 1, 1, 1);
        let other = commitment_preimage(2, &Pubkey::default(), &[0u8; 32], 1, 1, 1);
        assert_ne!(commitment_digest(&base), commitment_digest(&other));
    }

    proptest! {
        #[test]
        fn every_field_is_binding(
            chain_id in any::<u64>(),
            program_seed in any::<[u8; 32]>(),
            proof_hash in any::<[u8; 32]>(),
            start_slot in any::<u64>(),
            end_slot in any::<u64>(),
            seq in any::<u64>(),
            flip in 0usize..6,
        ) {
            let program_id = Pubkey::new_from_array(program_seed);
            let base = commitment_digest(&commitment_preimage(
                chain_id, &program_id, &proof_hash, start_slot, end_slot, seq,
            ));
            let mut chain_id2 = chain_id;
            let mut program_id2 = program_id;
            let mut proof_hash2 = proof_hash;
            let mut start2 = start_slot;
            let mut end2 = end_slot;
            let mut seq2 = seq;
            match flip {
                0 => chain_id2 = chain_id.wrapping_add(1),
                1 => {
                    let mut seed = program_seed;
                    seed[0] ^= 1;
                    program_id2 = Pubkey::new_from_array(seed);
                }
                2 => proof_hash2[31] ^= 1,
                3 => start2 = start_slot.wrapping_add(1),
                4 => end2 = end_slot.wrapping_add(1),
                _ => seq2 = seq.wrapping_add(1),
            }
            let changed = commitment_digest(&commitment_preimage(
                chain_id2, &program_id2, &proof_hash2, start2, end2, seq2,
            ));
            prop_assert_ne!(base, changed);
        }
    }
}
