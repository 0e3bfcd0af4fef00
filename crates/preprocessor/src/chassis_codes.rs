//! Fixed chassis-code lookup table, transcribed from
//! `findmycar/chassis_codes.py::CHASSIS_CODES`.

/// One chassis code's resolved vehicle identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChassisCodeEntry {
    pub code: &'static str,
    pub make: &'static str,
    pub model: &'static str,
    pub year_min: i32,
    pub year_max: i32,
    pub variant: &'static str,
}

/// The fixed chassis-code table. Order matters: longer/more specific codes
/// are listed before codes they could be mistaken as a substring of (e.g.
/// `"GR86"` before the bare Subaru `"GR"` code), so recognition finds the
/// most specific match first.
pub const CHASSIS_CODES: &[ChassisCodeEntry] = &[
    ChassisCodeEntry { code: "EG6", make: "Honda", model: "Civic", year_min: 1992, year_max: 1995, variant: "SiR/VTi Hatchback" },
    ChassisCodeEntry { code: "EG8", make: "Honda", model: "Civic", year_min: 1992, year_max: 1995, variant: "Sedan" },
    ChassisCodeEntry { code: "EG9", make: "Honda", model: "Civic", year_min: 1992, year_max: 1995, variant: "Ferio" },
    ChassisCodeEntry { code: "EK4", make: "Honda", model: "Civic", year_min: 1996, year_max: 2000, variant: "SiR" },
    ChassisCodeEntry { code: "EK9", make: "Honda", model: "Civic", year_min: 1997, year_max: 2000, variant: "Type R" },
    ChassisCodeEntry { code: "EM1", make: "Honda", model: "Civic", year_min: 1999, year_max: 2000, variant: "Si Coupe" },
    ChassisCodeEntry { code: "EP3", make: "Honda", model: "Civic", year_min: 2001, year_max: 2005, variant: "Type R/Si" },
    ChassisCodeEntry { code: "FD2", make: "Honda", model: "Civic", year_min: 2006, year_max: 2011, variant: "Type R" },
    ChassisCodeEntry { code: "FK8", make: "Honda", model: "Civic", year_min: 2017, year_max: 2021, variant: "Type R" },
    ChassisCodeEntry { code: "FL5", make: "Honda", model: "Civic", year_min: 2022, year_max: 2024, variant: "Type R" },
    ChassisCodeEntry { code: "CB7", make: "Honda", model: "Accord", year_min: 1990, year_max: 1993, variant: "4th Gen" },
    ChassisCodeEntry { code: "CD5", make: "Honda", model: "Accord", year_min: 1994, year_max: 1997, variant: "5th Gen" },
    ChassisCodeEntry { code: "CL7", make: "Honda", model: "Accord", year_min: 2003, year_max: 2007, variant: "Euro R" },
    ChassisCodeEntry { code: "CL9", make: "Honda", model: "Accord", year_min: 2003, year_max: 2007, variant: "7th Gen" },
    ChassisCodeEntry { code: "CG", make: "Honda", model: "Accord", year_min: 1998, year_max: 2002, variant: "6th Gen" },
    ChassisCodeEntry { code: "AP1", make: "Honda", model: "S2000", year_min: 1999, year_max: 2003, variant: "2.0L" },
    ChassisCodeEntry { code: "AP2", make: "Honda", model: "S2000", year_min: 2004, year_max: 2009, variant: "2.2L" },
    ChassisCodeEntry { code: "DC2", make: "Honda", model: "Integra", year_min: 1994, year_max: 2001, variant: "Type R" },
    ChassisCodeEntry { code: "DC5", make: "Honda", model: "RSX", year_min: 2002, year_max: 2006, variant: "Type S" },
    ChassisCodeEntry { code: "AE86", make: "Toyota", model: "Corolla", year_min: 1983, year_max: 1987, variant: "GT-S/Trueno" },
    ChassisCodeEntry { code: "JZA80", make: "Toyota", model: "Supra", year_min: 1993, year_max: 2002, variant: "Mk4" },
    ChassisCodeEntry { code: "JZA70", make: "Toyota", model: "Supra", year_min: 1986, year_max: 1992, variant: "Mk3" },
    ChassisCodeEntry { code: "SW20", make: "Toyota", model: "MR2", year_min: 1990, year_max: 1999, variant: "2nd Gen" },
    ChassisCodeEntry { code: "ZZW30", make: "Toyota", model: "MR2", year_min: 2000, year_max: 2007, variant: "Spyder" },
    ChassisCodeEntry { code: "GR86", make: "Toyota", model: "86", year_min: 2022, year_max: 2024, variant: "GR" },
    ChassisCodeEntry { code: "ZN6", make: "Toyota", model: "86", year_min: 2013, year_max: 2021, variant: "GT86/FRS" },
    ChassisCodeEntry { code: "S13", make: "Nissan", model: "240SX", year_min: 1989, year_max: 1994, variant: "Silvia" },
    ChassisCodeEntry { code: "S14", make: "Nissan", model: "240SX", year_min: 1995, year_max: 1998, variant: "Silvia" },
    ChassisCodeEntry { code: "S15", make: "Nissan", model: "Silvia", year_min: 1999, year_max: 2002, variant: "Spec R" },
    ChassisCodeEntry { code: "R32", make: "Nissan", model: "Skyline", year_min: 1989, year_max: 1994, variant: "GT-R" },
    ChassisCodeEntry { code: "R33", make: "Nissan", model: "Skyline", year_min: 1995, year_max: 1998, variant: "GT-R" },
    ChassisCodeEntry { code: "R34", make: "Nissan", model: "Skyline", year_min: 1999, year_max: 2002, variant: "GT-R" },
    ChassisCodeEntry { code: "R35", make: "Nissan", model: "GT-R", year_min: 2007, year_max: 2024, variant: "GT-R" },
    ChassisCodeEntry { code: "Z32", make: "Nissan", model: "300ZX", year_min: 1990, year_max: 1996, variant: "Twin Turbo" },
    ChassisCodeEntry { code: "Z33", make: "Nissan", model: "350Z", year_min: 2003, year_max: 2009, variant: "350Z" },
    ChassisCodeEntry { code: "Z34", make: "Nissan", model: "370Z", year_min: 2009, year_max: 2020, variant: "370Z" },
    ChassisCodeEntry { code: "NA", make: "Mazda", model: "Miata", year_min: 1990, year_max: 1997, variant: "MX-5" },
    ChassisCodeEntry { code: "NB", make: "Mazda", model: "Miata", year_min: 1998, year_max: 2005, variant: "MX-5" },
    ChassisCodeEntry { code: "NC", make: "Mazda", model: "Miata", year_min: 2006, year_max: 2015, variant: "MX-5" },
    ChassisCodeEntry { code: "ND", make: "Mazda", model: "Miata", year_min: 2016, year_max: 2024, variant: "MX-5" },
    ChassisCodeEntry { code: "FD", make: "Mazda", model: "RX-7", year_min: 1992, year_max: 2002, variant: "FD3S" },
    ChassisCodeEntry { code: "FC", make: "Mazda", model: "RX-7", year_min: 1986, year_max: 1991, variant: "FC3S" },
    ChassisCodeEntry { code: "GC8", make: "Subaru", model: "Impreza", year_min: 1992, year_max: 2000, variant: "WRX/STI" },
    ChassisCodeEntry { code: "GD", make: "Subaru", model: "Impreza", year_min: 2001, year_max: 2007, variant: "WRX/STI" },
    ChassisCodeEntry { code: "GR", make: "Subaru", model: "Impreza", year_min: 2008, year_max: 2014, variant: "WRX/STI" },
    ChassisCodeEntry { code: "VA", make: "Subaru", model: "WRX", year_min: 2015, year_max: 2021, variant: "STI" },
    ChassisCodeEntry { code: "VB", make: "Subaru", model: "WRX", year_min: 2022, year_max: 2024, variant: "WRX" },
    ChassisCodeEntry { code: "BRZ", make: "Subaru", model: "BRZ", year_min: 2013, year_max: 2024, variant: "BRZ" },
    ChassisCodeEntry { code: "CP9A", make: "Mitsubishi", model: "Lancer", year_min: 1996, year_max: 2001, variant: "Evolution IV-VI" },
    ChassisCodeEntry { code: "CT9A", make: "Mitsubishi", model: "Lancer", year_min: 2001, year_max: 2007, variant: "Evolution VII-IX" },
    ChassisCodeEntry { code: "CZ4A", make: "Mitsubishi", model: "Lancer", year_min: 2008, year_max: 2016, variant: "Evolution X" },
    ChassisCodeEntry { code: "E30", make: "BMW", model: "3 Series", year_min: 1982, year_max: 1994, variant: "E30" },
    ChassisCodeEntry { code: "E36", make: "BMW", model: "3 Series", year_min: 1990, year_max: 2000, variant: "E36" },
    ChassisCodeEntry { code: "E46", make: "BMW", model: "3 Series", year_min: 1997, year_max: 2006, variant: "E46" },
    ChassisCodeEntry { code: "E90", make: "BMW", model: "3 Series", year_min: 2005, year_max: 2013, variant: "E90/E92/E93" },
    ChassisCodeEntry { code: "F80", make: "BMW", model: "M3", year_min: 2014, year_max: 2020, variant: "F80" },
    ChassisCodeEntry { code: "G80", make: "BMW", model: "M3", year_min: 2021, year_max: 2024, variant: "G80" },
];

/// Finds the chassis code present in `query_upper` (already upper-cased),
/// trying longer codes first so e.g. `"GR86"` is matched before the bare
/// `"GR"` entry. Mirrors `chassis_codes.py::parse_chassis_code`'s plain
/// substring search.
pub fn recognize(query_upper: &str) -> Option<&'static ChassisCodeEntry> {
    let mut candidates: Vec<&ChassisCodeEntry> = CHASSIS_CODES.iter().collect();
    candidates.sort_by_key(|entry| std::cmp::Reverse(entry.code.len()));
    candidates.into_iter().find(|entry| query_upper.contains(entry.code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_eg6_chassis_code() {
        let entry = recognize("EG6").unwrap();
        assert_eq!(entry.make, "Honda");
        assert_eq!(entry.model, "Civic");
        assert_eq!(entry.year_min, 1992);
        assert_eq!(entry.year_max, 1995);
    }

    #[test]
    fn longer_code_wins_over_a_shorter_code_it_contains() {
        let entry = recognize("looking for a clean GR86").unwrap();
        assert_eq!(entry.code, "GR86");
    }

    #[test]
    fn no_match_returns_none() {
        assert!(recognize("HONDA CIVIC").is_none());
    }
}
