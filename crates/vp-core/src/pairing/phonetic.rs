//! Phonetic spelling of pairing codes for speech output.

/// Spoken form of a single code character.
fn spoken(c: char) -> Option<&'static str> {
    let word = match c.to_ascii_uppercase() {
        'A' => "'A' as in Apple",
        'B' => "'B' as in Bravo",
        'C' => "'C' as in Charlie",
        'D' => "'D' as in Delta",
        'E' => "'E' as in Echo",
        'F' => "'F' as in Fox trot",
        'G' => "'G' as in Golf",
        'H' => "'H' as in Hotel",
        'I' => "'I' as in India",
        'J' => "'J' as in Juliet",
        'K' => "'K' as in Kilogram",
        'L' => "'L' as in London",
        'M' => "'M' as in Mike",
        'N' => "'N' as in November",
        'O' => "'O' as in Oscar",
        'P' => "'P' as in Paul",
        'Q' => "'Q' as in Quebec",
        'R' => "'R' as in Romeo",
        'S' => "'S' as in Sierra",
        'T' => "'T' as in Tango",
        'U' => "'U' as in Uniform",
        'V' => "'V' as in Victor",
        'W' => "'W' as in Whiskey",
        'X' => "'X' as in X-Ray",
        'Y' => "'Y' as in Yankee",
        'Z' => "'Z' as in Zebra",
        '1' => "One",
        '2' => "Two",
        '3' => "Three",
        '4' => "Four",
        '5' => "Five",
        '6' => "Six",
        '7' => "Seven",
        '8' => "Eight",
        '9' => "Nine",
        '0' => "Zero",
        _ => return None,
    };
    Some(word)
}

/// Spell a code for text-to-speech, e.g. `"A1"` -> `"'A' as in Apple. One"`.
///
/// Characters without a spoken form (dashes, spaces) are skipped.
pub fn spell_code(code: &str) -> String {
    code.chars()
        .filter_map(spoken)
        .collect::<Vec<_>>()
        .join(". ")
}
