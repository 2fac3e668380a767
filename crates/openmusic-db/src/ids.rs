use rand::Rng;
use rand::distr::Alphanumeric;

const SUFFIX_LEN: usize = 16;

/// Opaque entity id: `{kind}-{16 random alphanumerics}`, e.g. `playlist-Qx3…`.
pub fn generate(kind: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{kind}-{suffix}")
}
