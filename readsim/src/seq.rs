use rand::Rng;

pub const BASES: &[u8; 4] = b"ACGT";

const fn revcmp_table() -> [u8; 256] {
    let mut table = [b'N'; 256];
    table[b'A' as usize] = b'T';
    table[b'C' as usize] = b'G';
    table[b'G' as usize] = b'C';
    table[b'T' as usize] = b'A';
    table[b'a' as usize] = b't';
    table[b'c' as usize] = b'g';
    table[b'g' as usize] = b'c';
    table[b't' as usize] = b'a';
    table[b'n' as usize] = b'n';
    table
}
const REVCMP: [u8; 256] = revcmp_table();

/// Reverse complement. Anything other than ACGTN (either case) becomes `N`.
pub fn revcmp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&x| REVCMP[x as usize]).collect()
}

pub fn is_acgt(base: u8) -> bool {
    BASES.contains(&base.to_ascii_uppercase())
}

pub fn has_ambiguous_base(seq: &[u8]) -> bool {
    seq.iter().any(|&b| !is_acgt(b))
}

pub fn random_base<R: Rng>(rng: &mut R) -> u8 {
    BASES[rng.gen_range(0..4)]
}

pub fn random_seq<R: Rng>(rng: &mut R, len: usize) -> Vec<u8> {
    (0..len).map(|_| random_base(rng)).collect()
}

/// One of the three other bases, uniformly. An ambiguous base turns into any of ACGT.
pub fn substitute<R: Rng>(base: u8, rng: &mut R) -> u8 {
    let base = base.to_ascii_uppercase();
    match BASES.iter().position(|&b| b == base) {
        Some(idx) => BASES[(idx + rng.gen_range(1..4)) % 4],
        None => random_base(rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    #[test]
    fn revcmp_test() {
        assert_eq!(revcmp(b"AACGTN"), b"NACGTT");
        assert_eq!(revcmp(&revcmp(b"ACCGTTGA")), b"ACCGTTGA");
        assert_eq!(revcmp(b"acgR"), b"Ncgt");
    }
    #[test]
    fn substitute_never_keeps_base() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(4);
        for &base in BASES.iter() {
            let mut seen = [0; 4];
            for _ in 0..300 {
                let sub = substitute(base, &mut rng);
                assert_ne!(sub, base);
                seen[BASES.iter().position(|&b| b == sub).unwrap()] += 1;
            }
            assert_eq!(seen.iter().filter(|&&c| c > 0).count(), 3);
        }
        assert!(is_acgt(substitute(b'N', &mut rng)));
    }
}
