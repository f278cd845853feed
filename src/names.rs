//! NAIF body names and ID numbers

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// First listed name wins for each ID
    static ref TARGET_NAMES: HashMap<i32, &'static str> = {
        let mut m = HashMap::new();
        for &(id, name) in TARGET_NAME_PAIRS.iter() {
            m.entry(id).or_insert(name);
        }
        m
    };
}

/// Canonical upper-case name of a body given its ID number
pub fn target_name(id: i32) -> Option<&'static str> {
    TARGET_NAMES.get(&id).copied()
}

/// Title-case a body name unless it is a designation like `1 CERES`,
/// `C/1995 O1` or `DSS-14` whose case is significant.
pub fn titlecase(name: &str) -> String {
    if ["1", "C/", "DSS-"].iter().any(|prefix| name.starts_with(prefix)) {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut previous_is_letter = false;
    for c in name.chars() {
        if previous_is_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_is_letter = c.is_alphabetic();
    }
    out
}

/// `Mars Barycenter (4)`, or `{unknown} (id)` for unlisted IDs
pub fn body_label(id: i32, unknown: &str) -> String {
    let name = titlecase(target_name(id).unwrap_or(unknown));
    format!("{name} ({id})")
}

/// Pairs of (id, name) for celestial bodies and common reference points
const TARGET_NAME_PAIRS: &[(i32, &str)] = &[
    (0, "SOLAR SYSTEM BARYCENTER"),
    (0, "SSB"),
    (1, "MERCURY BARYCENTER"),
    (2, "VENUS BARYCENTER"),
    (3, "EARTH BARYCENTER"),
    (3, "EMB"),
    (3, "EARTH MOON BARYCENTER"),
    (3, "EARTH-MOON BARYCENTER"),
    (4, "MARS BARYCENTER"),
    (5, "JUPITER BARYCENTER"),
    (6, "SATURN BARYCENTER"),
    (7, "URANUS BARYCENTER"),
    (8, "NEPTUNE BARYCENTER"),
    (9, "PLUTO BARYCENTER"),
    (10, "SUN"),
    (199, "MERCURY"),
    (299, "VENUS"),
    (399, "EARTH"),
    (301, "MOON"),
    (499, "MARS"),
    (401, "PHOBOS"),
    (402, "DEIMOS"),
    (599, "JUPITER"),
    (501, "IO"),
    (502, "EUROPA"),
    (503, "GANYMEDE"),
    (504, "CALLISTO"),
    (505, "AMALTHEA"),
    (699, "SATURN"),
    (601, "MIMAS"),
    (602, "ENCELADUS"),
    (603, "TETHYS"),
    (604, "DIONE"),
    (605, "RHEA"),
    (606, "TITAN"),
    (607, "HYPERION"),
    (608, "IAPETUS"),
    (609, "PHOEBE"),
    (799, "URANUS"),
    (701, "ARIEL"),
    (702, "UMBRIEL"),
    (703, "TITANIA"),
    (704, "OBERON"),
    (705, "MIRANDA"),
    (899, "NEPTUNE"),
    (801, "TRITON"),
    (802, "NEREID"),
    (999, "PLUTO"),
    (901, "CHARON"),
    (1000012, "67P/CHURYUMOV-GERASIMENKO (1969 R1)"),
    (1000036, "1P/HALLEY"),
    (2000001, "1 CERES"),
    (2000002, "2 PALLAS"),
    (2000004, "4 VESTA"),
    (2000433, "433 EROS"),
    (-82, "CASSINI"),
    (-31, "VOYAGER 1"),
    (-32, "VOYAGER 2"),
    (-48, "HUBBLE SPACE TELESCOPE"),
    (-98, "NEW HORIZONS"),
    (399001, "GOLDSTONE"),
    (399002, "CANBERRA"),
    (399003, "MADRID"),
    (399014, "DSS-14"),
    (399043, "DSS-43"),
    (399063, "DSS-63"),
];
