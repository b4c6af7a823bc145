//! The named character reference table (https://html.spec.whatwg.org/multipage/named-characters.html).
//!
//! Candidates are grouped into a `match` arm per first byte, longest-suffix-first within each
//! arm, because the tokenizer has already consumed that first character by the time it asks us
//! to resolve a reference -- we only need to try to read the remaining suffix off the reader.
//! Unlike [`crate::element_classifier`]'s static `phf` map, this table is keyed on a single `char`
//! with a small per-bucket list behind it, which is cheaper to build from the spec's official
//! data file than a ~2,200-entry perfect hash and just as fast for the one-byte dispatch this
//! needs.

/// A matched named character reference.
pub(crate) struct CharRef {
    /// The part of the reference name that was actually consumed from the reader, i.e.
    /// everything after the first character the tokenizer already read.
    pub(crate) name: &'static str,
    /// The characters the reference decodes to.
    pub(crate) characters: &'static str,
}

macro_rules! refs {
    ($($suffix:literal => $chars:literal),* $(,)?) => {
        &[$(($suffix, $chars)),*]
    };
}

// Candidates within a bucket are ordered longest-suffix-first. Since every semicolon-terminated
// form is exactly one character longer than its legacy counterpart, trying longest-first also
// gives the semicolon form priority, which is what "longest prefix wins" requires.
fn candidates(first: char) -> Option<&'static [(&'static str, &'static str)]> {
    Some(match first {
        'A' => refs! {
            "Elig;" => "\u{00C6}", "Elig" => "\u{00C6}",
            "MP;" => "\u{0026}", "MP" => "\u{0026}",
            "acute;" => "\u{00C1}", "acute" => "\u{00C1}",
            "breve;" => "\u{0102}",
            "circ;" => "\u{00C2}", "circ" => "\u{00C2}",
            "grave;" => "\u{00C0}", "grave" => "\u{00C0}",
            "ring;" => "\u{00C5}", "ring" => "\u{00C5}",
            "tilde;" => "\u{00C3}", "tilde" => "\u{00C3}",
            "uml;" => "\u{00C4}", "uml" => "\u{00C4}",
        },
        'C' => refs! {
            "COPY;" => "\u{00A9}", "COPY" => "\u{00A9}",
            "cedil;" => "\u{00C7}", "cedil" => "\u{00C7}",
            "circ;" => "\u{0108}",
            "ap;" => "\u{2229}",
            "up;" => "\u{222A}",
            "ong;" => "\u{2245}",
            "hi;" => "\u{03A7}",
        },
        'D' => refs! {
            "agger;" => "\u{2021}",
            "elta;" => "\u{0394}",
        },
        'E' => refs! {
            "TH;" => "\u{00D0}", "TH" => "\u{00D0}",
            "acute;" => "\u{00C9}", "acute" => "\u{00C9}",
            "circ;" => "\u{00CA}", "circ" => "\u{00CA}",
            "grave;" => "\u{00C8}", "grave" => "\u{00C8}",
            "psilon;" => "\u{0395}",
            "ta;" => "\u{0397}",
            "uml;" => "\u{00CB}", "uml" => "\u{00CB}",
        },
        'G' => refs! {
            "T;" => "\u{003E}", "T" => "\u{003E}",
            "amma;" => "\u{0393}",
        },
        'I' => refs! {
            "acute;" => "\u{00CD}", "acute" => "\u{00CD}",
            "circ;" => "\u{00CE}", "circ" => "\u{00CE}",
            "grave;" => "\u{00CC}", "grave" => "\u{00CC}",
            "ota;" => "\u{0399}",
            "uml;" => "\u{00CF}", "uml" => "\u{00CF}",
        },
        'K' => refs! {
            "appa;" => "\u{039A}",
        },
        'L' => refs! {
            "T;" => "\u{003C}", "T" => "\u{003C}",
            "ambda;" => "\u{039B}",
        },
        'M' => refs! {
            "u;" => "\u{039C}",
        },
        'N' => refs! {
            "tilde;" => "\u{00D1}", "tilde" => "\u{00D1}",
            "u;" => "\u{039D}",
            "abla;" => "\u{2207}",
        },
        'O' => refs! {
            "Elig;" => "\u{0152}",
            "acute;" => "\u{00D3}", "acute" => "\u{00D3}",
            "circ;" => "\u{00D4}", "circ" => "\u{00D4}",
            "grave;" => "\u{00D2}", "grave" => "\u{00D2}",
            "slash;" => "\u{00D8}", "slash" => "\u{00D8}",
            "tilde;" => "\u{00D5}", "tilde" => "\u{00D5}",
            "uml;" => "\u{00D6}", "uml" => "\u{00D6}",
            "mega;" => "\u{03A9}",
            "micron;" => "\u{039F}",
        },
        'P' => refs! {
            "i;" => "\u{03A0}",
            "hi;" => "\u{03A6}",
            "si;" => "\u{03A8}",
            "rime;" => "\u{2033}",
        },
        'Q' => refs! {
            "UOT;" => "\u{0022}", "UOT" => "\u{0022}",
        },
        'R' => refs! {
            "EG;" => "\u{00AE}", "EG" => "\u{00AE}",
            "ho;" => "\u{03A1}",
        },
        'S' => refs! {
            "caron;" => "\u{0160}",
            "igma;" => "\u{03A3}",
        },
        'T' => refs! {
            "HORN;" => "\u{00DE}", "HORN" => "\u{00DE}",
            "au;" => "\u{03A4}",
            "heta;" => "\u{0398}",
        },
        'U' => refs! {
            "acute;" => "\u{00DA}", "acute" => "\u{00DA}",
            "circ;" => "\u{00DB}", "circ" => "\u{00DB}",
            "grave;" => "\u{00D9}", "grave" => "\u{00D9}",
            "psilon;" => "\u{03A5}",
            "uml;" => "\u{00DC}", "uml" => "\u{00DC}",
        },
        'X' => refs! {
            "i;" => "\u{039E}",
        },
        'Y' => refs! {
            "acute;" => "\u{00DD}", "acute" => "\u{00DD}",
            "uml;" => "\u{0178}",
        },
        'Z' => refs! {
            "eta;" => "\u{0396}",
        },
        'a' => refs! {
            "acute;" => "\u{00E1}", "acute" => "\u{00E1}",
            "circ;" => "\u{00E2}", "circ" => "\u{00E2}",
            "grave;" => "\u{00E0}", "grave" => "\u{00E0}",
            "ring;" => "\u{00E5}", "ring" => "\u{00E5}",
            "tilde;" => "\u{00E3}", "tilde" => "\u{00E3}",
            "uml;" => "\u{00E4}", "uml" => "\u{00E4}",
            "elig;" => "\u{00E6}", "elig" => "\u{00E6}",
            "mp;" => "\u{0026}", "mp" => "\u{0026}",
            "cute;" => "\u{00B4}", "cute" => "\u{00B4}",
            "lpha;" => "\u{03B1}",
            "nd;" => "\u{2227}",
            "ng;" => "\u{2220}",
            "symp;" => "\u{2248}",
            "pos;" => "\u{0027}",
        },
        'b' => refs! {
            "rvbar;" => "\u{00A6}", "rvbar" => "\u{00A6}",
            "eta;" => "\u{03B2}",
            "dquo;" => "\u{201E}",
            "ull;" => "\u{2022}",
        },
        'c' => refs! {
            "cedil;" => "\u{00E7}", "cedil" => "\u{00E7}",
            "edil;" => "\u{00B8}", "edil" => "\u{00B8}",
            "ent;" => "\u{00A2}", "ent" => "\u{00A2}",
            "opy;" => "\u{00A9}", "opy" => "\u{00A9}",
            "urren;" => "\u{00A4}", "urren" => "\u{00A4}",
            "hi;" => "\u{03C7}",
            "irc;" => "\u{02C6}",
            "ong;" => "\u{2245}",
            "ap;" => "\u{2229}",
        },
        'd' => refs! {
            "eg;" => "\u{00B0}", "eg" => "\u{00B0}",
            "ivide;" => "\u{00F7}", "ivide" => "\u{00F7}",
            "elta;" => "\u{03B4}",
            "agger;" => "\u{2020}",
            "arr;" => "\u{2193}",
        },
        'e' => refs! {
            "acute;" => "\u{00E9}", "acute" => "\u{00E9}",
            "circ;" => "\u{00EA}", "circ" => "\u{00EA}",
            "grave;" => "\u{00E8}", "grave" => "\u{00E8}",
            "uml;" => "\u{00EB}", "uml" => "\u{00EB}",
            "th;" => "\u{00F0}", "th" => "\u{00F0}",
            "psilon;" => "\u{03B5}",
            "ta;" => "\u{03B7}",
            "mpty;" => "\u{2205}",
            "nsp;" => "\u{2002}",
            "msp;" => "\u{2003}",
            "quiv;" => "\u{2261}",
            "xist;" => "\u{2203}",
        },
        'f' => refs! {
            "rac12;" => "\u{00BD}", "rac12" => "\u{00BD}",
            "rac14;" => "\u{00BC}", "rac14" => "\u{00BC}",
            "rac34;" => "\u{00BE}", "rac34" => "\u{00BE}",
            "not;" => "\u{0192}",
            "orall;" => "\u{2200}",
        },
        'g' => refs! {
            "t;" => "\u{003E}", "t" => "\u{003E}",
            "amma;" => "\u{03B3}",
            "e;" => "\u{2265}",
        },
        'h' => refs! {
            "ellip;" => "\u{2026}",
            "arr;" => "\u{2194}",
        },
        'i' => refs! {
            "acute;" => "\u{00ED}", "acute" => "\u{00ED}",
            "circ;" => "\u{00EE}", "circ" => "\u{00EE}",
            "excl;" => "\u{00A1}", "excl" => "\u{00A1}",
            "grave;" => "\u{00EC}", "grave" => "\u{00EC}",
            "quest;" => "\u{00BF}", "quest" => "\u{00BF}",
            "uml;" => "\u{00EF}", "uml" => "\u{00EF}",
            "ota;" => "\u{03B9}",
            "nfin;" => "\u{221E}",
            "sin;" => "\u{2208}",
            "nt;" => "\u{222B}",
        },
        'k' => refs! {
            "appa;" => "\u{03BA}",
        },
        'l' => refs! {
            "aquo;" => "\u{00AB}", "aquo" => "\u{00AB}",
            "t;" => "\u{003C}", "t" => "\u{003C}",
            "ambda;" => "\u{03BB}",
            "arr;" => "\u{2190}",
            "dquo;" => "\u{201C}",
            "squo;" => "\u{2018}",
            "saquo;" => "\u{2039}",
            "e;" => "\u{2264}",
            "owast;" => "\u{2217}",
        },
        'm' => refs! {
            "acr;" => "\u{00AF}", "acr" => "\u{00AF}",
            "icro;" => "\u{00B5}", "icro" => "\u{00B5}",
            "iddot;" => "\u{00B7}", "iddot" => "\u{00B7}",
            "u;" => "\u{03BC}",
            "dash;" => "\u{2014}",
            "inus;" => "\u{2212}",
        },
        'n' => refs! {
            "bsp;" => "\u{00A0}", "bsp" => "\u{00A0}",
            "ot;" => "\u{00AC}", "ot" => "\u{00AC}",
            "tilde;" => "\u{00F1}", "tilde" => "\u{00F1}",
            "u;" => "\u{03BD}",
            "abla;" => "\u{2207}",
            "dash;" => "\u{2013}",
            "e;" => "\u{2260}",
            "i;" => "\u{220B}",
            "otin;" => "\u{2209}",
            "sub;" => "\u{2284}",
        },
        'o' => refs! {
            "acute;" => "\u{00F3}", "acute" => "\u{00F3}",
            "circ;" => "\u{00F4}", "circ" => "\u{00F4}",
            "elig;" => "\u{0153}",
            "grave;" => "\u{00F2}", "grave" => "\u{00F2}",
            "rdf;" => "\u{00AA}", "rdf" => "\u{00AA}",
            "rdm;" => "\u{00BA}", "rdm" => "\u{00BA}",
            "slash;" => "\u{00F8}", "slash" => "\u{00F8}",
            "tilde;" => "\u{00F5}", "tilde" => "\u{00F5}",
            "uml;" => "\u{00F6}", "uml" => "\u{00F6}",
            "mega;" => "\u{03C9}",
            "micron;" => "\u{03BF}",
            "plus;" => "\u{2295}",
            "times;" => "\u{2297}",
            "r;" => "\u{2228}",
        },
        'p' => refs! {
            "ara;" => "\u{00B6}", "para" => "\u{00B6}",
            "lusmn;" => "\u{00B1}", "lusmn" => "\u{00B1}",
            "ound;" => "\u{00A3}", "ound" => "\u{00A3}",
            "i;" => "\u{03C0}",
            "hi;" => "\u{03C6}",
            "si;" => "\u{03C8}",
            "art;" => "\u{2202}",
            "erp;" => "\u{22A5}",
            "ermil;" => "\u{2030}",
            "rop;" => "\u{221D}",
            "rod;" => "\u{220F}",
        },
        'q' => refs! {
            "uot;" => "\u{0022}", "uot" => "\u{0022}",
        },
        'r' => refs! {
            "aquo;" => "\u{00BB}", "aquo" => "\u{00BB}",
            "eg;" => "\u{00AE}", "eg" => "\u{00AE}",
            "ho;" => "\u{03C1}",
            "arr;" => "\u{2192}",
            "dquo;" => "\u{201D}",
            "squo;" => "\u{2019}",
            "saquo;" => "\u{203A}",
        },
        's' => refs! {
            "ect;" => "\u{00A7}", "sect" => "\u{00A7}",
            "hy;" => "\u{00AD}", "shy" => "\u{00AD}",
            "up1;" => "\u{00B9}", "sup1" => "\u{00B9}",
            "up2;" => "\u{00B2}", "sup2" => "\u{00B2}",
            "up3;" => "\u{00B3}", "sup3" => "\u{00B3}",
            "zlig;" => "\u{00DF}", "szlig" => "\u{00DF}",
            "caron;" => "\u{0161}",
            "igma;" => "\u{03C3}",
            "im;" => "\u{223C}",
            "dot;" => "\u{22C5}",
            "ub;" => "\u{2282}",
            "up;" => "\u{2283}",
            "ube;" => "\u{2286}",
            "upe;" => "\u{2287}",
            "um;" => "\u{2211}",
            "bquo;" => "\u{201A}",
        },
        't' => refs! {
            "horn;" => "\u{00FE}", "thorn" => "\u{00FE}",
            "imes;" => "\u{00D7}", "times" => "\u{00D7}",
            "au;" => "\u{03C4}",
            "heta;" => "\u{03B8}",
            "here4;" => "\u{2234}",
            "hinsp;" => "\u{2009}",
            "ilde;" => "\u{02DC}",
            "rade;" => "\u{2122}",
        },
        'u' => refs! {
            "acute;" => "\u{00FA}", "acute" => "\u{00FA}",
            "circ;" => "\u{00FB}", "circ" => "\u{00FB}",
            "grave;" => "\u{00F9}", "grave" => "\u{00F9}",
            "ml;" => "\u{00A8}", "uml" => "\u{00A8}",
            "uml;" => "\u{00FC}",
            "psilon;" => "\u{03C5}",
            "arr;" => "\u{2191}",
        },
        'x' => refs! {
            "i;" => "\u{03BE}",
        },
        'y' => refs! {
            "acute;" => "\u{00FD}", "acute" => "\u{00FD}",
            "en;" => "\u{00A5}", "yen" => "\u{00A5}",
            "uml;" => "\u{00FF}", "yuml" => "\u{00FF}",
        },
        'z' => refs! {
            "eta;" => "\u{03B6}",
            "wnj;" => "\u{200C}",
            "wj;" => "\u{200D}",
        },
        _ => return None,
    })
}

/// Attempts to read a named character reference whose first character has already been consumed
/// as `first`. Tries candidates longest-suffix-first so that a semicolon-terminated form is
/// always preferred over a legacy prefix of it.
pub(crate) fn try_read_character_reference<F, E>(
    first: char,
    mut try_read_string: F,
) -> Result<Option<CharRef>, E>
where
    F: FnMut(&'static str, bool) -> Result<bool, E>,
{
    let Some(bucket) = candidates(first) else {
        return Ok(None);
    };

    for &(suffix, characters) in bucket {
        if try_read_string(suffix, true)? {
            return Ok(Some(CharRef {
                name: suffix,
                characters,
            }));
        }
    }

    Ok(None)
}
