//! H.264 sequence parameter set parsing.

use bitstream_io::{BigEndian, BitRead, BitReader};

use super::utils::{flag, se, ue};
use crate::types::VideoInfo;

/// Parses an SPS RBSP (NAL header removed) into the coded picture format.
pub fn parse_avc_sps(rbsp: &[u8]) -> Option<VideoInfo> {
    let mut br = BitReader::endian(rbsp, BigEndian);

    let profile_idc = br.read::<8, u8>().ok()?;
    br.skip(16).ok()?; // constraint flags + level_idc
    ue(&mut br)?; // seq_parameter_set_id

    let mut chroma_format_idc = 1;
    if matches!(profile_idc, 100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 144) {
        chroma_format_idc = ue(&mut br)?;
        if chroma_format_idc == 3 {
            br.skip(1).ok()?; // separate_colour_plane_flag
        }
        ue(&mut br)?; // bit_depth_luma_minus8
        ue(&mut br)?; // bit_depth_chroma_minus8
        br.skip(1).ok()?; // qpprime_y_zero_transform_bypass_flag
        if flag(&mut br)? {
            let lists = if chroma_format_idc == 3 { 12 } else { 8 };
            for idx in 0..lists {
                if flag(&mut br)? {
                    skip_scaling_list(&mut br, if idx < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    ue(&mut br)?; // log2_max_frame_num_minus4
    match ue(&mut br)? {
        0 => {
            ue(&mut br)?; // log2_max_pic_order_cnt_lsb_minus4
        }
        1 => {
            br.skip(1).ok()?; // delta_pic_order_always_zero_flag
            se(&mut br)?; // offset_for_non_ref_pic
            se(&mut br)?; // offset_for_top_to_bottom_field
            for _ in 0..ue(&mut br)? {
                se(&mut br)?;
            }
        }
        _ => {}
    }
    ue(&mut br)?; // max_num_ref_frames
    br.skip(1).ok()?; // gaps_in_frame_num_value_allowed_flag

    let width_mbs = ue(&mut br)? + 1;
    let height_map_units = ue(&mut br)? + 1;
    let frame_mbs_only = flag(&mut br)?;
    if !frame_mbs_only {
        br.skip(1).ok()?; // mb_adaptive_frame_field_flag
    }
    br.skip(1).ok()?; // direct_8x8_inference_flag

    let (crop_l, crop_r, crop_t, crop_b) = if flag(&mut br)? {
        (ue(&mut br)?, ue(&mut br)?, ue(&mut br)?, ue(&mut br)?)
    } else {
        (0, 0, 0, 0)
    };

    let fps = if flag(&mut br)? { read_vui_fps(&mut br).unwrap_or(0.0) } else { 0.0 };

    let field_factor = if frame_mbs_only { 1 } else { 2 };
    let crop_unit_x = if matches!(chroma_format_idc, 0 | 3) { 1 } else { 2 };
    let crop_unit_y = match chroma_format_idc {
        1 => 2 * field_factor,
        _ => field_factor,
    };
    let width = (width_mbs * 16).checked_sub((crop_l + crop_r) * crop_unit_x)?;
    let height = (height_map_units * field_factor * 16).checked_sub((crop_t + crop_b) * crop_unit_y)?;

    Some(VideoInfo {
        codec: "H.264".to_string(),
        width: width as u16,
        height: height as u16,
        fps,
        chroma: match chroma_format_idc {
            0 => "4:0:0",
            1 => "4:2:0",
            2 => "4:2:2",
            3 => "4:4:4",
            _ => "?",
        }
        .to_string(),
    })
}

fn skip_scaling_list<R: std::io::Read>(br: &mut BitReader<R, BigEndian>, size: usize) -> Option<()> {
    let mut last = 8i32;
    let mut next = 8i32;
    for _ in 0..size {
        if next != 0 {
            next = (last + se(br)? + 256) % 256;
        }
        if next != 0 {
            last = next;
        }
    }
    Some(())
}

fn read_vui_fps<R: std::io::Read>(br: &mut BitReader<R, BigEndian>) -> Option<f32> {
    if flag(br)? {
        // aspect_ratio_info_present_flag
        if br.read::<8, u8>().ok()? == 255 {
            br.skip(32).ok()?; // sar_width + sar_height
        }
    }
    if flag(br)? {
        br.skip(1).ok()?; // overscan_appropriate_flag
    }
    if flag(br)? {
        br.skip(4).ok()?; // video_format + video_full_range_flag
        if flag(br)? {
            br.skip(24).ok()?; // colour description
        }
    }
    if flag(br)? {
        ue(br)?;
        ue(br)?;
    }
    if !flag(br)? {
        return None;
    }
    let num_units_in_tick = br.read::<32, u32>().ok()?;
    let time_scale = br.read::<32, u32>().ok()?;
    if num_units_in_tick == 0 || time_scale == 0 {
        return None;
    }
    let fps = time_scale as f32 / (2.0 * num_units_in_tick as f32);
    (1.0..=120.0).contains(&fps).then_some(fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_sps_dimensions() {
        // Baseline 320x240, no VUI:
        // profile 66, flags 0, level 30, sps_id 0, log2_max_frame_num 0,
        // poc_type 2, max_ref 1, gaps 0, width_mbs-1 = 19, height-1 = 14,
        // frame_mbs_only 1, direct_8x8 1, cropping 0, vui 0
        let rbsp = [0x42, 0x00, 0x1E, 0xDA, 0x05, 0x07, 0xE0];
        let info = parse_avc_sps(&rbsp).unwrap();
        assert_eq!(info.codec, "H.264");
        assert_eq!((info.width, info.height), (320, 240));
        assert_eq!(info.chroma, "4:2:0");
    }
}
