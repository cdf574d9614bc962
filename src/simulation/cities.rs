//! Named junction sets for the built-in city presets
//!
//! Each preset lists nine labels for a 3x3 grid, column by column.

/// A city preset: its name and junction labels
#[derive(Debug, Clone, Copy)]
pub struct CityPreset {
    pub name: &'static str,
    pub labels: &'static [&'static str],
}

pub const CITY_PRESETS: &[CityPreset] = &[
    CityPreset {
        name: "Bangalore",
        labels: &[
            "Silk Board", "Hebbal Flyover", "KR Puram",
            "Sony Signal", "Dairy Circle", "Tin Factory",
            "Madiwala", "Richmond Circle", "Indiranagar",
        ],
    },
    CityPreset {
        name: "Mumbai",
        labels: &[
            "Teen Hath Naka", "Dadar TT", "Sion Circle",
            "JVLR Junction", "Andheri West", "Bandra Node",
            "Worli Naka", "Chembur Naka", "Haji Ali",
        ],
    },
    CityPreset {
        name: "Delhi",
        labels: &[
            "ITO Junction", "AIIMS Loop", "Dhaula Kuan",
            "Ashram Chowk", "Peeragarhi", "Kashmere Gate",
            "Lajpat Nagar", "Rajiv Chowk", "Moolchand",
        ],
    },
    CityPreset {
        name: "Chennai",
        labels: &[
            "Kathipara", "Teynampet", "Madhya Kailash",
            "Tidel Park", "Anna Nagar", "Koyambedu",
            "Chromepet", "Guindy", "Velachery",
        ],
    },
    CityPreset {
        name: "Hyderabad",
        labels: &[
            "Cyber Towers", "Mindspace", "Gachibowli",
            "Panjagutta", "Paradise", "Jubilee Post",
            "Kukatpally", "LB Nagar", "Charminar",
        ],
    },
    CityPreset {
        name: "Kolkata",
        labels: &[
            "Park Street", "Esplanade", "Gariahat",
            "Shyambazar", "Howrah Bridge", "Ultadanga",
            "Science City", "Jadavpur", "New Town",
        ],
    },
    CityPreset {
        name: "Pune",
        labels: &[
            "Univ. Circle", "Swargate", "Deccan Gym",
            "Hinjewadi", "Magarpatta", "Yerwada",
            "Bremen Chowk", "Chandni Chowk", "Koregaon Park",
        ],
    },
];

/// Look up a preset by name, ignoring case.
pub fn city_preset(name: &str) -> Option<&'static CityPreset> {
    CITY_PRESETS
        .iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(name))
}

/// Label for the junction at column `x`, row `y`.
///
/// Labels are consumed column by column; junctions past the end of the list
/// get a generic sector name.
pub fn junction_label(labels: &[String], x: u32, y: u32, grid_size: u32) -> String {
    let slot = (x * grid_size + y) as usize;
    labels
        .get(slot)
        .cloned()
        .unwrap_or_else(|| format!("Sector {}-{}", x, y))
}

impl CityPreset {
    pub fn owned_labels(&self) -> Vec<String> {
        self.labels.iter().map(|label| label.to_string()).collect()
    }
}
