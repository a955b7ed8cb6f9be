//! Closed value sets for enum-like settings
//!
//! Each table maps the protocol symbol to the label shown to users and the
//! numeric value mirrored in [`crate::InvokableAction::current_value`].

/// One member of a closed value set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    pub symbol: &'static str,
    pub description: &'static str,
    pub value: i32,
}

/// Closed value set of a setting
#[derive(Debug, PartialEq, Eq)]
pub struct SettingEnum {
    pub name: &'static str,
    pub values: &'static [EnumValue],
}

impl SettingEnum {
    /// Resolve a user-facing description or a symbol, ignoring case
    pub fn resolve(&self, input: &str) -> Option<&'static EnumValue> {
        let input = input.trim();
        self.values
            .iter()
            .find(|v| v.description.eq_ignore_ascii_case(input))
            .or_else(|| self.values.iter().find(|v| v.symbol.eq_ignore_ascii_case(input)))
    }

    /// Look up by exact symbol
    pub fn by_symbol(&self, symbol: &str) -> Option<&'static EnumValue> {
        self.values.iter().find(|v| v.symbol == symbol)
    }

    /// Descriptions in table order
    pub fn descriptions(&self) -> impl Iterator<Item = &'static str> {
        self.values.iter().map(|v| v.description)
    }
}

const fn v(symbol: &'static str, description: &'static str, value: i32) -> EnumValue {
    EnumValue {
        symbol,
        description,
        value,
    }
}

pub static PICTURE_MODE: SettingEnum = SettingEnum {
    name: "PictureMode",
    values: &[
        v("cinema", "Cinema", 0),
        v("eco", "Eco", 1),
        v("expert1", "Expert (Bright room)", 2),
        v("expert2", "Expert (Dark room)", 3),
        v("game", "Game", 4),
        v("normal", "Standard", 5),
        v("photo", "Photo", 6),
        v("sports", "Sports", 7),
        v("technicolor", "Technicolor", 8),
        v("vivid", "Vivid", 9),
        v("filmMaker", "Filmmaker", 10),
        v("hdrCinema", "HDR Cinema", 11),
        v("hdrCinemaBright", "HDR Cinema Home", 12),
        v("hdrGame", "HDR Game", 13),
        v("hdrStandard", "HDR Standard", 14),
        v("hdrVivid", "HDR Vivid", 15),
        v("hdrFilmMaker", "HDR Filmmaker", 16),
        v("dolbyHdrCinema", "Dolby Vision Cinema", 17),
        v("dolbyHdrCinemaBright", "Dolby Vision Cinema Home", 18),
        v("dolbyHdrGame", "Dolby Vision Game", 19),
        v("dolbyHdrStandard", "Dolby Vision Standard", 20),
        v("dolbyHdrVivid", "Dolby Vision Vivid", 21),
    ],
};

pub static COLOR_GAMUT: SettingEnum = SettingEnum {
    name: "ColorGamut",
    values: &[
        v("auto", "Auto", 0),
        v("extended", "Extended", 1),
        v("wide", "Wide", 2),
        v("srgb", "sRGB", 3),
        v("native", "Native", 4),
    ],
};

pub static OFF_TO_HIGH: SettingEnum = SettingEnum {
    name: "OffToHigh",
    values: &[
        v("off", "Off", 0),
        v("low", "Low", 1),
        v("medium", "Medium", 2),
        v("high", "High", 3),
    ],
};

pub static OFF_TO_AUTO: SettingEnum = SettingEnum {
    name: "OffToAuto",
    values: &[
        v("off", "Off", 0),
        v("low", "Low", 1),
        v("medium", "Medium", 2),
        v("high", "High", 3),
        v("auto", "Auto", 4),
    ],
};

pub static GAMMA: SettingEnum = SettingEnum {
    name: "GammaExp",
    values: &[
        v("low", "1.9", 0),
        v("medium", "2.2", 1),
        v("high1", "2.4", 2),
        v("high2", "BT.1886", 3),
    ],
};

pub static ENERGY_SAVING: SettingEnum = SettingEnum {
    name: "EnergySaving",
    values: &[
        v("auto", "Auto", 0),
        v("off", "Off", 1),
        v("min", "Minimum", 2),
        v("med", "Medium", 3),
        v("max", "Maximum", 4),
        v("screen_off", "Screen off", 5),
    ],
};

pub static DYNAMIC_TONE_MAPPING: SettingEnum = SettingEnum {
    name: "DynamicTonemapping",
    values: &[
        v("on", "On", 0),
        v("off", "Off", 1),
        v("HGIG", "HGIG", 2),
    ],
};

pub static OFF_TO_ON: SettingEnum = SettingEnum {
    name: "OffToOn",
    values: &[v("off", "Off", 0), v("on", "On", 1)],
};

pub static FALSE_TO_TRUE: SettingEnum = SettingEnum {
    name: "FalseToTrue",
    values: &[v("false", "Off", 0), v("true", "On", 1)],
};

pub static HDMI_ICON: SettingEnum = SettingEnum {
    name: "HdmiIcon",
    values: &[
        v("hdmigeneric", "HDMI", 0),
        v("satellite", "Satellite", 1),
        v("settopbox", "Set-Top Box", 2),
        v("dvd", "DVD Player", 3),
        v("bluray", "Blu-ray Player", 4),
        v("hometheater", "Home Theater", 5),
        v("gameconsole", "Game Console", 6),
        v("streamingbox", "Streaming Box", 7),
        v("camera", "Digital Camera", 8),
        v("pc", "PC", 9),
        v("mobile", "Mobile Device", 10),
    ],
};
