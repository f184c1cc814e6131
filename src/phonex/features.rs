//! Phonetic feature bundles for base glyphs.

use bitflags::bitflags;

bitflags! {
    /// A set of phonetic features.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FeatureSet: u64 {
        const CONSONANT = 1 << 0;
        const VOWEL = 1 << 1;
        const GLIDE = 1 << 2;
        const SONORANT = 1 << 3;
        const OBSTRUENT = 1 << 4;
        const CONTINUANT = 1 << 5;
        const VOICED = 1 << 6;
        const VOICELESS = 1 << 7;

        const LABIAL = 1 << 8;
        const CORONAL = 1 << 9;
        const DORSAL = 1 << 10;
        const GUTTURAL = 1 << 11;
        const BILABIAL = 1 << 12;
        const LABIODENTAL = 1 << 13;
        const DENTAL = 1 << 14;
        const ALVEOLAR = 1 << 15;
        const POSTALVEOLAR = 1 << 16;
        const RETROFLEX = 1 << 17;
        const PALATAL = 1 << 18;
        const VELAR = 1 << 19;
        const UVULAR = 1 << 20;
        const PHARYNGEAL = 1 << 21;
        const GLOTTAL = 1 << 22;

        const STOP = 1 << 23;
        const FRICATIVE = 1 << 24;
        const NASAL = 1 << 25;
        const TRILL = 1 << 26;
        const TAP = 1 << 27;
        const LATERAL = 1 << 28;
        const APPROXIMANT = 1 << 29;
        const LIQUID = 1 << 30;
        const RHOTIC = 1 << 31;

        const HIGH = 1 << 32;
        const MID = 1 << 33;
        const LOW = 1 << 34;
        const FRONT = 1 << 35;
        const CENTRAL = 1 << 36;
        const BACK = 1 << 37;
        const ROUND = 1 << 38;
        const TENSE = 1 << 39;
        const LAX = 1 << 40;
    }
}

/// Feature names accepted in `{...}` matchers, synonyms included.
const FEATURE_NAMES: &[(&str, FeatureSet)] = &[
    ("consonant", FeatureSet::CONSONANT),
    ("cons", FeatureSet::CONSONANT),
    ("c", FeatureSet::CONSONANT),
    ("vowel", FeatureSet::VOWEL),
    ("v", FeatureSet::VOWEL),
    ("glide", FeatureSet::GLIDE),
    ("g", FeatureSet::GLIDE),
    ("sonorant", FeatureSet::SONORANT),
    ("son", FeatureSet::SONORANT),
    ("obstruent", FeatureSet::OBSTRUENT),
    ("obs", FeatureSet::OBSTRUENT),
    ("continuant", FeatureSet::CONTINUANT),
    ("cont", FeatureSet::CONTINUANT),
    ("voiced", FeatureSet::VOICED),
    ("voice", FeatureSet::VOICED),
    ("voiceless", FeatureSet::VOICELESS),
    ("labial", FeatureSet::LABIAL),
    ("lab", FeatureSet::LABIAL),
    ("coronal", FeatureSet::CORONAL),
    ("cor", FeatureSet::CORONAL),
    ("dorsal", FeatureSet::DORSAL),
    ("dor", FeatureSet::DORSAL),
    ("guttural", FeatureSet::GUTTURAL),
    ("bilabial", FeatureSet::BILABIAL),
    ("labiodental", FeatureSet::LABIODENTAL),
    ("dental", FeatureSet::DENTAL),
    ("alveolar", FeatureSet::ALVEOLAR),
    ("postalveolar", FeatureSet::POSTALVEOLAR),
    ("retroflex", FeatureSet::RETROFLEX),
    ("palatal", FeatureSet::PALATAL),
    ("velar", FeatureSet::VELAR),
    ("uvular", FeatureSet::UVULAR),
    ("pharyngeal", FeatureSet::PHARYNGEAL),
    ("glottal", FeatureSet::GLOTTAL),
    ("stop", FeatureSet::STOP),
    ("plosive", FeatureSet::STOP),
    ("fricative", FeatureSet::FRICATIVE),
    ("nasal", FeatureSet::NASAL),
    ("trill", FeatureSet::TRILL),
    ("tap", FeatureSet::TAP),
    ("flap", FeatureSet::TAP),
    ("lateral", FeatureSet::LATERAL),
    ("approximant", FeatureSet::APPROXIMANT),
    ("liquid", FeatureSet::LIQUID),
    ("rhotic", FeatureSet::RHOTIC),
    ("high", FeatureSet::HIGH),
    ("mid", FeatureSet::MID),
    ("low", FeatureSet::LOW),
    ("front", FeatureSet::FRONT),
    ("central", FeatureSet::CENTRAL),
    ("back", FeatureSet::BACK),
    ("round", FeatureSet::ROUND),
    ("rounded", FeatureSet::ROUND),
    ("tense", FeatureSet::TENSE),
    ("lax", FeatureSet::LAX),
];

impl FeatureSet {
    /// Look up a feature by name or synonym, ignoring case.
    pub fn lookup(name: &str) -> Option<FeatureSet> {
        FEATURE_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
    }

    /// Features of a base glyph; empty for glyphs outside the table.
    pub fn for_glyph(base: char) -> FeatureSet {
        use FeatureSet as F;

        let bilabial = F::BILABIAL | F::LABIAL;
        let labiodental = F::LABIODENTAL | F::LABIAL;
        let dental = F::DENTAL | F::CORONAL;
        let alveolar = F::ALVEOLAR | F::CORONAL;
        let postalveolar = F::POSTALVEOLAR | F::CORONAL;
        let retroflex = F::RETROFLEX | F::CORONAL;
        let palatal = F::PALATAL | F::DORSAL;
        let velar = F::VELAR | F::DORSAL;
        let uvular = F::UVULAR | F::DORSAL;
        let pharyngeal = F::PHARYNGEAL | F::GUTTURAL;
        let glottal = F::GLOTTAL | F::GUTTURAL;

        match base {
            'p' => consonant(bilabial, F::STOP, false),
            'b' => consonant(bilabial, F::STOP, true),
            't' => consonant(alveolar, F::STOP, false),
            'd' => consonant(alveolar, F::STOP, true),
            'ʈ' => consonant(retroflex, F::STOP, false),
            'ɖ' => consonant(retroflex, F::STOP, true),
            'c' => consonant(palatal, F::STOP, false),
            'ɟ' => consonant(palatal, F::STOP, true),
            'k' => consonant(velar, F::STOP, false),
            'g' | 'ɡ' => consonant(velar, F::STOP, true),
            'q' => consonant(uvular, F::STOP, false),
            'ɢ' => consonant(uvular, F::STOP, true),
            'ʔ' => consonant(glottal, F::STOP, false),

            'm' => consonant(bilabial, F::NASAL, true),
            'ɱ' => consonant(labiodental, F::NASAL, true),
            'n' => consonant(alveolar, F::NASAL, true),
            'ɳ' => consonant(retroflex, F::NASAL, true),
            'ɲ' => consonant(palatal, F::NASAL, true),
            'ŋ' => consonant(velar, F::NASAL, true),
            'ɴ' => consonant(uvular, F::NASAL, true),

            'ʙ' => consonant(bilabial, F::TRILL, true),
            'r' => consonant(alveolar, F::TRILL | F::LIQUID | F::RHOTIC, true),
            'ʀ' => consonant(uvular, F::TRILL | F::RHOTIC, true),
            'ⱱ' => consonant(labiodental, F::TAP, true),
            'ɾ' => consonant(alveolar, F::TAP | F::LIQUID | F::RHOTIC, true),
            'ɽ' => consonant(retroflex, F::TAP | F::LIQUID | F::RHOTIC, true),

            'ɸ' => consonant(bilabial, F::FRICATIVE, false),
            'β' => consonant(bilabial, F::FRICATIVE, true),
            'f' => consonant(labiodental, F::FRICATIVE, false),
            'v' => consonant(labiodental, F::FRICATIVE, true),
            'θ' => consonant(dental, F::FRICATIVE, false),
            'ð' => consonant(dental, F::FRICATIVE, true),
            's' => consonant(alveolar, F::FRICATIVE, false),
            'z' => consonant(alveolar, F::FRICATIVE, true),
            'ʃ' => consonant(postalveolar, F::FRICATIVE, false),
            'ʒ' => consonant(postalveolar, F::FRICATIVE, true),
            'ʂ' => consonant(retroflex, F::FRICATIVE, false),
            'ʐ' => consonant(retroflex, F::FRICATIVE, true),
            'ç' => consonant(palatal, F::FRICATIVE, false),
            'ʝ' => consonant(palatal, F::FRICATIVE, true),
            'x' => consonant(velar, F::FRICATIVE, false),
            'ɣ' => consonant(velar, F::FRICATIVE, true),
            'χ' => consonant(uvular, F::FRICATIVE, false),
            'ʁ' => consonant(uvular, F::FRICATIVE | F::RHOTIC, true),
            'ħ' => consonant(pharyngeal, F::FRICATIVE, false),
            'ʕ' => consonant(pharyngeal, F::FRICATIVE, true),
            'h' => consonant(glottal, F::FRICATIVE, false),
            'ɦ' => consonant(glottal, F::FRICATIVE, true),
            'ɬ' => consonant(alveolar, F::FRICATIVE | F::LATERAL, false),
            'ɮ' => consonant(alveolar, F::FRICATIVE | F::LATERAL, true),

            'ʋ' => consonant(labiodental, F::APPROXIMANT, true),
            'ɹ' => consonant(alveolar, F::APPROXIMANT | F::LIQUID | F::RHOTIC, true),
            'ɻ' => consonant(retroflex, F::APPROXIMANT | F::LIQUID | F::RHOTIC, true),
            'l' | 'ɫ' => consonant(alveolar, F::APPROXIMANT | F::LATERAL | F::LIQUID, true),
            'ɭ' => consonant(retroflex, F::APPROXIMANT | F::LATERAL | F::LIQUID, true),
            'ʎ' => consonant(palatal, F::APPROXIMANT | F::LATERAL | F::LIQUID, true),
            'ʟ' => consonant(velar, F::APPROXIMANT | F::LATERAL | F::LIQUID, true),

            'j' => glide(palatal),
            'w' => glide(F::LABIAL | velar),
            'ɥ' => glide(F::LABIAL | palatal),
            'ɰ' => glide(velar),

            'i' => vowel(F::HIGH | F::FRONT | F::TENSE),
            'y' => vowel(F::HIGH | F::FRONT | F::ROUND | F::TENSE),
            'ɨ' => vowel(F::HIGH | F::CENTRAL),
            'ʉ' => vowel(F::HIGH | F::CENTRAL | F::ROUND),
            'ɯ' => vowel(F::HIGH | F::BACK),
            'u' => vowel(F::HIGH | F::BACK | F::ROUND | F::TENSE),
            'ɪ' => vowel(F::HIGH | F::FRONT | F::LAX),
            'ʏ' => vowel(F::HIGH | F::FRONT | F::ROUND | F::LAX),
            'ʊ' => vowel(F::HIGH | F::BACK | F::ROUND | F::LAX),
            'e' => vowel(F::MID | F::FRONT | F::TENSE),
            'ø' => vowel(F::MID | F::FRONT | F::ROUND | F::TENSE),
            'ɘ' => vowel(F::MID | F::CENTRAL),
            'ɵ' => vowel(F::MID | F::CENTRAL | F::ROUND),
            'ɤ' => vowel(F::MID | F::BACK),
            'o' => vowel(F::MID | F::BACK | F::ROUND | F::TENSE),
            'ə' => vowel(F::MID | F::CENTRAL | F::LAX),
            'ɚ' | 'ɝ' => vowel(F::MID | F::CENTRAL | F::RHOTIC),
            'ɛ' => vowel(F::MID | F::FRONT | F::LAX),
            'œ' => vowel(F::MID | F::FRONT | F::ROUND | F::LAX),
            'ɜ' => vowel(F::MID | F::CENTRAL | F::LAX),
            'ɞ' => vowel(F::MID | F::CENTRAL | F::ROUND | F::LAX),
            'ʌ' => vowel(F::MID | F::BACK | F::LAX),
            'ɔ' => vowel(F::MID | F::BACK | F::ROUND | F::LAX),
            'æ' => vowel(F::LOW | F::FRONT),
            'ɐ' => vowel(F::LOW | F::CENTRAL),
            'a' => vowel(F::LOW | F::FRONT),
            'ɶ' => vowel(F::LOW | F::FRONT | F::ROUND),
            'ɑ' => vowel(F::LOW | F::BACK),
            'ɒ' => vowel(F::LOW | F::BACK | F::ROUND),

            _ => FeatureSet::empty(),
        }
    }
}

fn consonant(place: FeatureSet, manner: FeatureSet, voiced: bool) -> FeatureSet {
    let mut set = FeatureSet::CONSONANT | place | manner;
    if manner.intersects(FeatureSet::STOP | FeatureSet::FRICATIVE) {
        set |= FeatureSet::OBSTRUENT;
    } else {
        set |= FeatureSet::SONORANT;
    }
    if !manner.intersects(FeatureSet::STOP | FeatureSet::NASAL) {
        set |= FeatureSet::CONTINUANT;
    }
    set | if voiced {
        FeatureSet::VOICED
    } else {
        FeatureSet::VOICELESS
    }
}

fn glide(place: FeatureSet) -> FeatureSet {
    FeatureSet::GLIDE
        | FeatureSet::APPROXIMANT
        | FeatureSet::SONORANT
        | FeatureSet::CONTINUANT
        | FeatureSet::VOICED
        | place
}

fn vowel(quality: FeatureSet) -> FeatureSet {
    FeatureSet::VOWEL
        | FeatureSet::SONORANT
        | FeatureSet::CONTINUANT
        | FeatureSet::VOICED
        | FeatureSet::DORSAL
        | quality
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_synonyms_resolve() {
        assert_eq!(FeatureSet::lookup("Consonant"), Some(FeatureSet::CONSONANT));
        assert_eq!(FeatureSet::lookup("c"), Some(FeatureSet::CONSONANT));
        assert_eq!(FeatureSet::lookup("plosive"), Some(FeatureSet::STOP));
        assert_eq!(FeatureSet::lookup("invalid"), None);
        assert_eq!(FeatureSet::from_name("CONSONANT"), Some(FeatureSet::CONSONANT));
        assert_eq!(FeatureSet::from_name("c"), None);
    }

    #[test]
    fn glyph_classes() {
        assert!(FeatureSet::for_glyph('b').contains(FeatureSet::CONSONANT | FeatureSet::VOICED));
        assert!(FeatureSet::for_glyph('s').contains(FeatureSet::OBSTRUENT | FeatureSet::CONTINUANT));
        assert!(FeatureSet::for_glyph('ə').contains(FeatureSet::VOWEL));
        assert!(FeatureSet::for_glyph('j').contains(FeatureSet::GLIDE));
        assert!(!FeatureSet::for_glyph('j').contains(FeatureSet::CONSONANT));
        assert!(FeatureSet::for_glyph('↔').is_empty());
    }
}
