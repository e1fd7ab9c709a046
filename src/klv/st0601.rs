//! MISB ST 0601 UAS Datalink Local Set and the embedded ST 0102 security set.

use super::schema::{ElementDef, ElementKind, FloatMapping, RawInt};

/// Universal key of the UAS Datalink Local Set.
pub const UAS_DATALINK_LS_KEY: [u8; 16] = [
    0x06, 0x0E, 0x2B, 0x34, // SMPTE designator
    0x02, 0x0B, 0x01, 0x01, // local set, BER length, 1-byte tags
    0x0E, 0x01, 0x03, 0x01, // MISB
    0x01, 0x00, 0x00, 0x00, // ST 0601
];

pub const UAS_DATALINK_LOCAL_SET: &str = "UAS Datalink Local Set";

pub const CHECKSUM_TAG: u32 = 1;
pub const SECURITY_LOCAL_SET_TAG: u32 = 48;

pub const CHECKSUM: &str = "checksum";
pub const TIMESTAMP: &str = "timestamp";
pub const MISSION_ID: &str = "mission id";
pub const PLATFORM_TAIL_NUMBER: &str = "platform tail number";
pub const PLATFORM_HEADING_ANGLE: &str = "platform heading angle";
pub const PLATFORM_PITCH_ANGLE: &str = "platform pitch angle";
pub const PLATFORM_ROLL_ANGLE: &str = "platform roll angle";
pub const PLATFORM_DESIGNATION: &str = "platform designation";
pub const IMAGE_SOURCE_SENSOR: &str = "image source sensor";
pub const IMAGE_COORDINATE_SYSTEM: &str = "image coordinate system";
pub const SENSOR_LATITUDE: &str = "sensor latitude";
pub const SENSOR_LONGITUDE: &str = "sensor longitude";
pub const SENSOR_TRUE_ALTITUDE: &str = "sensor true altitude";
pub const SENSOR_HORIZONTAL_FOV: &str = "sensor horizontal field of view";
pub const SENSOR_VERTICAL_FOV: &str = "sensor vertical field of view";
pub const SLANT_RANGE: &str = "slant range";
pub const TARGET_WIDTH: &str = "target width";
pub const FRAME_CENTER_LATITUDE: &str = "frame center latitude";
pub const FRAME_CENTER_LONGITUDE: &str = "frame center longitude";
pub const FRAME_CENTER_ELEVATION: &str = "frame center elevation";
pub const OFFSET_CORNER_LATITUDE_1: &str = "offset corner latitude 1";
pub const OFFSET_CORNER_LONGITUDE_1: &str = "offset corner longitude 1";
pub const OFFSET_CORNER_LATITUDE_2: &str = "offset corner latitude 2";
pub const OFFSET_CORNER_LONGITUDE_2: &str = "offset corner longitude 2";
pub const OFFSET_CORNER_LATITUDE_3: &str = "offset corner latitude 3";
pub const OFFSET_CORNER_LONGITUDE_3: &str = "offset corner longitude 3";
pub const OFFSET_CORNER_LATITUDE_4: &str = "offset corner latitude 4";
pub const OFFSET_CORNER_LONGITUDE_4: &str = "offset corner longitude 4";
pub const TARGET_LOCATION_LATITUDE: &str = "target location latitude";
pub const TARGET_LOCATION_LONGITUDE: &str = "target location longitude";
pub const TARGET_LOCATION_ELEVATION: &str = "target location elevation";
pub const SECURITY_LOCAL_METADATA_SET: &str = "security local metadata set";
pub const GROUND_RANGE: &str = "ground range";
pub const PLATFORM_CALL_SIGN: &str = "platform call sign";
pub const UAS_LS_VERSION_NUMBER: &str = "UAS LS version number";
pub const EVENT_START_TIME: &str = "event start time";
pub const OPERATIONAL_MODE: &str = "operational mode";
pub const CORNER_LATITUDE_1: &str = "corner latitude 1";
pub const CORNER_LONGITUDE_1: &str = "corner longitude 1";
pub const CORNER_LATITUDE_2: &str = "corner latitude 2";
pub const CORNER_LONGITUDE_2: &str = "corner longitude 2";
pub const CORNER_LATITUDE_3: &str = "corner latitude 3";
pub const CORNER_LONGITUDE_3: &str = "corner longitude 3";
pub const CORNER_LATITUDE_4: &str = "corner latitude 4";
pub const CORNER_LONGITUDE_4: &str = "corner longitude 4";

pub const SECURITY_CLASSIFICATION: &str = "security classification";
pub const CLASSIFYING_COUNTRY_CODING_METHOD: &str = "country coding method";
pub const CLASSIFYING_COUNTRY: &str = "classifying country";
pub const OBJECT_COUNTRY_CODING_METHOD: &str = "object country coding method";
pub const OBJECT_COUNTRY_CODES: &str = "object country codes";

const LATITUDE: ElementKind = ElementKind::Mapped(FloatMapping::new(RawInt::I32, -90.0, 90.0));
const LONGITUDE: ElementKind = ElementKind::Mapped(FloatMapping::new(RawInt::I32, -180.0, 180.0));
const ALTITUDE: ElementKind = ElementKind::Mapped(FloatMapping::new(RawInt::U16, -900.0, 19000.0));
const RANGE: ElementKind = ElementKind::Mapped(FloatMapping::new(RawInt::U32, 0.0, 5_000_000.0));
const OFFSET: ElementKind = ElementKind::Mapped(FloatMapping::new(RawInt::I16, -0.075, 0.075));
const FOV: ElementKind = ElementKind::Mapped(FloatMapping::new(RawInt::U16, 0.0, 180.0));

pub static SECURITY_ELEMENTS: [ElementDef; 5] = [
    ElementDef::new(1, SECURITY_CLASSIFICATION, ElementKind::Unsigned(1)),
    ElementDef::new(2, CLASSIFYING_COUNTRY_CODING_METHOD, ElementKind::Unsigned(1)),
    ElementDef::new(3, CLASSIFYING_COUNTRY, ElementKind::Text),
    ElementDef::new(12, OBJECT_COUNTRY_CODING_METHOD, ElementKind::Unsigned(1)),
    ElementDef::new(13, OBJECT_COUNTRY_CODES, ElementKind::Text),
];

pub static UAS_ELEMENTS: [ElementDef; 49] = [
    ElementDef::new(CHECKSUM_TAG, CHECKSUM, ElementKind::Unsigned(2)),
    ElementDef::new(2, TIMESTAMP, ElementKind::Unsigned(8)),
    ElementDef::new(3, MISSION_ID, ElementKind::Text),
    ElementDef::new(4, PLATFORM_TAIL_NUMBER, ElementKind::Text),
    ElementDef::new(
        5,
        PLATFORM_HEADING_ANGLE,
        ElementKind::Mapped(FloatMapping::new(RawInt::U16, 0.0, 360.0)),
    ),
    ElementDef::new(
        6,
        PLATFORM_PITCH_ANGLE,
        ElementKind::Mapped(FloatMapping::new(RawInt::I16, -20.0, 20.0)),
    ),
    ElementDef::new(
        7,
        PLATFORM_ROLL_ANGLE,
        ElementKind::Mapped(FloatMapping::new(RawInt::I16, -50.0, 50.0)),
    ),
    ElementDef::new(10, PLATFORM_DESIGNATION, ElementKind::Text),
    ElementDef::new(11, IMAGE_SOURCE_SENSOR, ElementKind::Text),
    ElementDef::new(12, IMAGE_COORDINATE_SYSTEM, ElementKind::Text),
    ElementDef::new(13, SENSOR_LATITUDE, LATITUDE),
    ElementDef::new(14, SENSOR_LONGITUDE, LONGITUDE),
    ElementDef::new(15, SENSOR_TRUE_ALTITUDE, ALTITUDE),
    ElementDef::new(16, SENSOR_HORIZONTAL_FOV, FOV),
    ElementDef::new(17, SENSOR_VERTICAL_FOV, FOV),
    ElementDef::new(
        18,
        "sensor relative azimuth angle",
        ElementKind::Mapped(FloatMapping::new(RawInt::U32, 0.0, 360.0)),
    ),
    ElementDef::new(
        19,
        "sensor relative elevation angle",
        ElementKind::Mapped(FloatMapping::new(RawInt::I32, -180.0, 180.0)),
    ),
    ElementDef::new(21, SLANT_RANGE, RANGE),
    ElementDef::new(
        22,
        TARGET_WIDTH,
        ElementKind::Mapped(FloatMapping::new(RawInt::U16, 0.0, 10_000.0)),
    ),
    ElementDef::new(23, FRAME_CENTER_LATITUDE, LATITUDE),
    ElementDef::new(24, FRAME_CENTER_LONGITUDE, LONGITUDE),
    ElementDef::new(25, FRAME_CENTER_ELEVATION, ALTITUDE),
    ElementDef::new(26, OFFSET_CORNER_LATITUDE_1, OFFSET),
    ElementDef::new(27, OFFSET_CORNER_LONGITUDE_1, OFFSET),
    ElementDef::new(28, OFFSET_CORNER_LATITUDE_2, OFFSET),
    ElementDef::new(29, OFFSET_CORNER_LONGITUDE_2, OFFSET),
    ElementDef::new(30, OFFSET_CORNER_LATITUDE_3, OFFSET),
    ElementDef::new(31, OFFSET_CORNER_LONGITUDE_3, OFFSET),
    ElementDef::new(32, OFFSET_CORNER_LATITUDE_4, OFFSET),
    ElementDef::new(33, OFFSET_CORNER_LONGITUDE_4, OFFSET),
    ElementDef::new(40, TARGET_LOCATION_LATITUDE, LATITUDE),
    ElementDef::new(41, TARGET_LOCATION_LONGITUDE, LONGITUDE),
    ElementDef::new(42, TARGET_LOCATION_ELEVATION, ALTITUDE),
    ElementDef::new(
        SECURITY_LOCAL_SET_TAG,
        SECURITY_LOCAL_METADATA_SET,
        ElementKind::LocalSet(&SECURITY_ELEMENTS),
    ),
    ElementDef::new(57, GROUND_RANGE, RANGE),
    ElementDef::new(59, PLATFORM_CALL_SIGN, ElementKind::Text),
    ElementDef::new(65, UAS_LS_VERSION_NUMBER, ElementKind::Unsigned(1)),
    ElementDef::new(72, EVENT_START_TIME, ElementKind::Unsigned(8)),
    ElementDef::new(77, OPERATIONAL_MODE, ElementKind::Unsigned(1)),
    ElementDef::new(82, CORNER_LATITUDE_1, LATITUDE),
    ElementDef::new(83, CORNER_LONGITUDE_1, LONGITUDE),
    ElementDef::new(84, CORNER_LATITUDE_2, LATITUDE),
    ElementDef::new(85, CORNER_LONGITUDE_2, LONGITUDE),
    ElementDef::new(86, CORNER_LATITUDE_3, LATITUDE),
    ElementDef::new(87, CORNER_LONGITUDE_3, LONGITUDE),
    ElementDef::new(88, CORNER_LATITUDE_4, LATITUDE),
    ElementDef::new(89, CORNER_LONGITUDE_4, LONGITUDE),
    ElementDef::new(
        90,
        "platform pitch angle (full)",
        ElementKind::Mapped(FloatMapping::new(RawInt::I32, -90.0, 90.0)),
    ),
    ElementDef::new(
        91,
        "platform roll angle (full)",
        ElementKind::Mapped(FloatMapping::new(RawInt::I32, -90.0, 90.0)),
    ),
];

/// Definition of a UAS Datalink item by tag.
pub fn element(tag: u32) -> Option<&'static ElementDef> {
    UAS_ELEMENTS.iter().find(|d| d.tag == tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tags_and_names_are_unique() {
        let tags: HashSet<u32> = UAS_ELEMENTS.iter().map(|d| d.tag).collect();
        let names: HashSet<&str> = UAS_ELEMENTS.iter().map(|d| d.name).collect();
        assert_eq!(tags.len(), UAS_ELEMENTS.len());
        assert_eq!(names.len(), UAS_ELEMENTS.len());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(element(13).map(|d| d.name), Some(SENSOR_LATITUDE));
        assert!(matches!(element(48).map(|d| d.kind), Some(ElementKind::LocalSet(_))));
        assert!(element(200).is_none());
    }
}
