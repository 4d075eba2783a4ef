//! Co-processor and peripheral classification.
//!
//! Cartridges identify an attached chip through combinations of the mapper,
//! chipset and company header bytes. The combinations are not orthogonal, so
//! classification is an ordered rule table: the first matching rule wins,
//! which keeps the order-sensitive legacy behavior explicit.

/// Auxiliary compute or clock chip embedded in a cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coprocessor {
    None,
    Dsp1,
    Dsp2,
    Dsp3,
    Dsp4,
    St010,
    St011,
    Obc1,
    Spc7110,
    Cx4,
    Sdd1,
    Sa1,
    Gsu,
}

impl Coprocessor {
    /// Chip identifier bits in the descriptor's mapping byte, as consumed by
    /// the core loader.
    pub fn legacy_code(self) -> u8 {
        match self {
            Coprocessor::None => 0x00,
            Coprocessor::Dsp1 => 0x80,
            Coprocessor::Dsp2 => 0x90,
            Coprocessor::Dsp3 => 0xa0,
            Coprocessor::Dsp4 => 0xb0,
            Coprocessor::St010 => 0x88,
            Coprocessor::St011 => 0xa8,
            Coprocessor::Obc1 => 0xc0,
            Coprocessor::Spc7110 => 0xd0,
            Coprocessor::Cx4 => 0x40,
            Coprocessor::Sdd1 => 0x50,
            Coprocessor::Sa1 => 0x60,
            Coprocessor::Gsu => 0x70,
        }
    }
}

/// Classification result: the chip, an optional RAM-size override, and
/// whether a real-time clock is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipClassification {
    pub chip: Coprocessor,
    pub ram_size: Option<u8>,
    pub rtc: bool,
}

impl ChipClassification {
    pub const NONE: ChipClassification = ChipClassification {
        chip: Coprocessor::None,
        ram_size: None,
        rtc: false,
    };

    const fn chip(chip: Coprocessor) -> ChipClassification {
        ChipClassification {
            chip,
            ram_size: None,
            rtc: false,
        }
    }
}

/// Header-derived inputs to [`classify`].
///
/// `rom_size` is the raw header byte; `size_class` is the computed
/// power-of-two class of the actual image. The two are deliberately
/// separate: the ST010/ST011 split keys on the header byte while the SDD1
/// rule keys on the computed class.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput {
    pub mapper: u8,
    pub rom_type: u8,
    pub company: u8,
    pub rom_size: u8,
    pub size_class: u8,
    /// Expansion-RAM size byte, found three bytes below the header base.
    pub expansion_ram: u8,
}

type Predicate = fn(&ClassifyInput) -> bool;
type Build = fn(&ClassifyInput) -> ChipClassification;

/// Classification rules in priority order; the first match wins.
const RULES: &[(Predicate, Build)] = &[
    (
        |i| (i.mapper == 0x20 || i.mapper == 0x21) && i.rom_type == 0x03,
        |_| ChipClassification::chip(Coprocessor::Dsp1),
    ),
    (
        |i| i.mapper == 0x30 && i.rom_type == 0x05 && i.company != 0xb2,
        |_| ChipClassification::chip(Coprocessor::Dsp1),
    ),
    (
        |i| i.mapper == 0x31 && (i.rom_type == 0x03 || i.rom_type == 0x05),
        |_| ChipClassification::chip(Coprocessor::Dsp1),
    ),
    (
        |i| i.mapper == 0x20 && i.rom_type == 0x05,
        |_| ChipClassification::chip(Coprocessor::Dsp2),
    ),
    (
        |i| i.mapper == 0x30 && i.rom_type == 0x05 && i.company == 0xb2,
        |_| ChipClassification::chip(Coprocessor::Dsp3),
    ),
    (
        |i| i.mapper == 0x30 && i.rom_type == 0x03,
        |_| ChipClassification::chip(Coprocessor::Dsp4),
    ),
    (
        |i| i.mapper == 0x30 && i.rom_type == 0xf6,
        |i| ChipClassification {
            chip: if i.rom_size < 10 {
                Coprocessor::St011
            } else {
                Coprocessor::St010
            },
            ram_size: Some(1),
            rtc: false,
        },
    ),
    (
        |i| i.mapper == 0x30 && i.rom_type == 0x25,
        |_| ChipClassification::chip(Coprocessor::Obc1),
    ),
    (
        |i| i.mapper == 0x3a && (i.rom_type == 0xf5 || i.rom_type == 0xf9),
        |i| ChipClassification {
            chip: Coprocessor::Spc7110,
            ram_size: None,
            rtc: i.rom_type == 0xf9,
        },
    ),
    (
        // S-RTC: clock only, no compute chip.
        |i| i.mapper == 0x35 && i.rom_type == 0x55,
        |_| ChipClassification {
            chip: Coprocessor::None,
            ram_size: None,
            rtc: true,
        },
    ),
    (
        |i| i.mapper == 0x20 && i.rom_type == 0xf3,
        |_| ChipClassification::chip(Coprocessor::Cx4),
    ),
    (
        // Skipped at 32 mbit and above: Star Ocean's un-SDD1 dump matches
        // the byte pattern but carries no chip.
        |i| i.mapper == 0x32 && (i.rom_type == 0x43 || i.rom_type == 0x45) && i.size_class < 14,
        |_| ChipClassification::chip(Coprocessor::Sdd1),
    ),
    (
        |i| {
            i.mapper == 0x23
                && (i.rom_type == 0x32 || i.rom_type == 0x34 || i.rom_type == 0x35)
        },
        |_| ChipClassification::chip(Coprocessor::Sa1),
    ),
    (
        |i| {
            i.mapper == 0x20
                && (i.rom_type == 0x13
                    || i.rom_type == 0x14
                    || i.rom_type == 0x15
                    || i.rom_type == 0x1a)
        },
        |i| {
            // RAM size comes from the expansion header; StarFox leaves the
            // field unprogrammed (0xff).
            let ram = if i.expansion_ram == 0xff {
                5
            } else {
                i.expansion_ram.min(6)
            };
            ChipClassification {
                chip: Coprocessor::Gsu,
                ram_size: Some(ram),
                rtc: false,
            }
        },
    ),
];

/// Classify the cartridge's peripheral from header bytes. Rules are
/// evaluated in priority order; the first match wins.
pub fn classify(input: &ClassifyInput) -> ChipClassification {
    RULES
        .iter()
        .find(|(matches, _)| matches(input))
        .map(|(_, build)| build(input))
        .unwrap_or(ChipClassification::NONE)
}

/// Whether the region byte maps to an alternate-region (PAL) system. Two
/// disjoint code ranges do.
pub fn is_pal_region(region: u8) -> bool {
    matches!(region, 0x02..=0x0c | 0x11)
}
