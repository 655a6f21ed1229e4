//! Seeded random number generators for patient-level sampling.
//!
//! Every patient gets its own random number generator, derived
//! from the global seed and a string id naming the stream. This
//! decouples patients from each other (so generation order and
//! thread count do not change the data) and decouples the
//! genomic draws from the clinical draws (so switching genomics
//! on or off does not change the clinical columns).

use blake2::{Blake2b512, Digest};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Stream used for demographics, comorbidities and outcome
pub const CLINICAL_STREAM: &str = "clinical";

/// Stream used for the mutation panel and the read matrix
pub const GENOMIC_STREAM: &str = "genomic";

/// Make a random number generator from a global seed
/// and a string id.
///
/// The id is concatenated with the global seed and the result
/// is hashed. The first 32 bytes of the hash seed the generator.
///
/// It is up to the caller to ensure that an id is used only
/// once with the same global seed (unless the same random numbers
/// are desired).
pub fn make_rng(global_seed: u64, id: &str) -> ChaCha8Rng {
    let message = format!("{id}{global_seed}");
    let mut hasher = Blake2b512::new();
    hasher.update(message);
    let digest = hasher.finalize();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest[0..32]);
    ChaCha8Rng::from_seed(seed)
}

/// Random number generator for one stream of one patient.
///
/// The separator keeps ("clinical", 11) and ("clinical1", 1)
/// from colliding.
pub fn patient_rng(global_seed: u64, stream: &str, patient_id: u64) -> ChaCha8Rng {
    make_rng(global_seed, &format!("{stream}/{patient_id}/"))
}
