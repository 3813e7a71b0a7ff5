// src/addressing/bitmap.rs

// Lecture des bitmaps de tick arrays. Chaque bit levé signale qu'un sous-intervalle
// de `range_size` ticks possède un compte TickArray initialisé.

/// Nombre de bits d'un bitmap d'extension (8 mots de 64 bits).
pub const EXTENSION_BITMAP_BITS: i64 = 512;

/// Index absolus des bits levés, dans l'ordre croissant.
fn set_bits(words: &[u64]) -> impl Iterator<Item = usize> + '_ {
    words.iter().enumerate().flat_map(|(word_index, &word)| {
        (0..64usize)
            .filter(move |bit| word & (1u64 << bit) != 0)
            .map(move |bit| word_index * 64 + bit)
    })
}

/// Bitmap "centré" : la première moitié des bits couvre les offsets négatifs,
/// la seconde les positifs. Le bit `i` donne le début `(i - mid) * range_size`.
///
/// Les offsets qui sortent d'un `i32` ne peuvent pas être des index de tick : ils
/// sont ignorés. Un `range_size` nul ou négatif ne désigne aucun tick array.
pub fn scan(words: &[u64], range_size: i32) -> Vec<i32> {
    if range_size <= 0 {
        return Vec::new();
    }
    let mid = (words.len() * 64 / 2) as i64;

    set_bits(words)
        .filter_map(|bit| i32::try_from((bit as i64 - mid) * range_size as i64).ok())
        .collect()
}

/// Bitmaps de l'extension Raydium, au-delà de la couverture du bitmap du pool.
///
/// Le bitmap positif `o` couvre `[(o+1)·T, (o+2)·T)` et le négatif `o` couvre
/// `[-(o+2)·T, -(o+1)·T)`, avec `T = 512 · range_size`. Dans les deux cas le bit
/// `b` correspond à un départ `borne_basse + b · range_size`.
pub fn scan_extension(positive: &[[u64; 8]], negative: &[[u64; 8]], range_size: i32) -> Vec<i32> {
    if range_size <= 0 {
        return Vec::new();
    }
    let range = range_size as i64;
    let span = EXTENSION_BITMAP_BITS * range;

    let lower_bounds = negative
        .iter()
        .enumerate()
        .map(|(offset, words)| (-(offset as i64 + 2) * span, words))
        .chain(
            positive
                .iter()
                .enumerate()
                .map(|(offset, words)| ((offset as i64 + 1) * span, words)),
        );

    let mut starts: Vec<i32> = lower_bounds
        .flat_map(|(lower, words)| {
            set_bits(words.as_slice())
                .map(move |bit| lower + bit as i64 * range)
                .collect::<Vec<_>>()
        })
        .filter_map(|start| i32::try_from(start).ok())
        .collect();
    starts.sort_unstable();
    starts
}

/// Début du tick array qui contient `tick_index` (division euclidienne, donc
/// correcte pour les ticks négatifs).
pub fn array_start_index(tick_index: i32, tick_spacing: u16, array_len: usize) -> i32 {
    let ticks_in_array = (array_len as i32) * (tick_spacing as i32);
    tick_index.div_euclid(ticks_in_array) * ticks_in_array
}
