//! Preset gradient palettes.
//!
//! Stop tables derived from the cpt-city gradient collection, stored as
//! byte positions (0–255) plus per-channel values and converted to
//! [`Palette`] stops on demand. Index order matters: the debug palette
//! cycling commands step through this table.

use crate::palette::Palette;

struct Preset {
    positions: &'static [u8],
    r: &'static [u8],
    g: &'static [u8],
    b: &'static [u8],
}

impl Preset {
    fn build(&self) -> Palette {
        let colors: Vec<i64> = (0..self.positions.len())
            .map(|i| {
                (i64::from(self.r[i]) << 16) | (i64::from(self.g[i]) << 8) | i64::from(self.b[i])
            })
            .collect();
        let positions: Vec<f32> = self
            .positions
            .iter()
            .map(|&p| f32::from(p) / 255.0)
            .collect();
        Palette::from_stops(&colors, &positions)
    }
}

macro_rules! preset {
    ($pos:expr, $r:expr, $g:expr, $b:expr) => {
        Preset {
            positions: &$pos,
            r: &$r,
            g: &$g,
            b: &$b,
        }
    };
}

#[rustfmt::skip]
static PRESETS: &[Preset] = &[
    // sunset_real
    preset!([0, 22, 51, 85, 135, 198, 255],
            [120, 179, 255, 167, 100, 16, 0],
            [0, 22, 104, 22, 0, 0, 0],
            [0, 0, 0, 18, 103, 130, 160]),
    // es_rivendell_15
    preset!([0, 101, 165, 242, 255],
            [1, 16, 56, 150, 150],
            [14, 36, 68, 156, 156],
            [5, 14, 30, 99, 99]),
    // es_ocean_breeze_036
    preset!([0, 89, 153, 255],
            [1, 1, 144, 0],
            [6, 99, 209, 73],
            [7, 111, 255, 82]),
    // rgi_15
    preset!([0, 31, 63, 95, 127, 159, 191, 223, 255],
            [4, 55, 197, 59, 6, 39, 112, 56, 22],
            [1, 1, 3, 2, 2, 6, 13, 9, 6],
            [31, 16, 7, 17, 34, 33, 32, 35, 38]),
    // retro2_16
    preset!([0, 255], [188, 46], [135, 7], [1, 1]),
    // analogous_1
    preset!([0, 63, 127, 191, 255],
            [3, 23, 67, 142, 255],
            [0, 0, 0, 0, 0],
            [255, 255, 255, 45, 0]),
    // es_pinksplash_08
    preset!([0, 127, 175, 221, 255],
            [126, 197, 210, 157, 157],
            [11, 1, 157, 3, 3],
            [255, 22, 172, 112, 112]),
    // coral_reef
    preset!([0, 50, 96, 96, 139, 255],
            [40, 10, 1, 43, 10, 1],
            [199, 152, 111, 127, 73, 34],
            [197, 155, 120, 162, 111, 71]),
    // es_ocean_breeze_068
    preset!([0, 51, 101, 104, 178, 255],
            [100, 1, 1, 35, 0, 1],
            [156, 99, 68, 142, 63, 10],
            [153, 137, 84, 168, 117, 10]),
    // es_pinksplash_07
    preset!([0, 61, 101, 127, 153, 193, 255],
            [229, 242, 255, 249, 255, 244, 232],
            [1, 4, 12, 81, 11, 5, 1],
            [1, 63, 255, 252, 235, 68, 5]),
    // es_vintage_01
    preset!([0, 51, 76, 101, 127, 153, 229, 255],
            [4, 16, 97, 255, 67, 16, 4, 4],
            [1, 0, 104, 131, 9, 0, 1, 1],
            [1, 1, 3, 19, 4, 1, 1, 1]),
    // departure
    preset!([0, 42, 63, 84, 106, 116, 138, 148, 170, 191, 212, 255],
            [8, 23, 75, 169, 213, 255, 135, 22, 0, 0, 0, 0],
            [3, 7, 38, 99, 169, 255, 255, 255, 255, 136, 55, 55],
            [0, 0, 6, 38, 119, 255, 138, 24, 0, 0, 0, 0]),
    // es_landscape_64
    preset!([0, 37, 76, 127, 128, 130, 153, 204, 255],
            [0, 2, 15, 79, 126, 188, 144, 59, 1],
            [0, 25, 115, 213, 211, 209, 182, 117, 37],
            [0, 1, 5, 1, 47, 247, 205, 250, 192]),
    // es_landscape_33
    preset!([0, 19, 38, 63, 66, 255],
            [1, 32, 161, 229, 39, 1],
            [5, 23, 55, 144, 142, 4],
            [0, 1, 1, 1, 74, 1]),
    // rainbowsherbet
    preset!([0, 43, 86, 127, 170, 209, 255],
            [255, 255, 255, 255, 255, 42, 87],
            [33, 68, 7, 82, 255, 255, 255],
            [4, 25, 25, 103, 242, 22, 65]),
    // gr65_hult
    preset!([0, 48, 89, 160, 216, 255],
            [247, 255, 220, 7, 1, 1],
            [176, 136, 29, 82, 124, 124],
            [247, 255, 226, 178, 109, 109]),
    // gr64_hult
    preset!([0, 66, 104, 130, 150, 201, 239, 255],
            [1, 1, 52, 115, 52, 1, 0, 0],
            [124, 93, 65, 127, 65, 86, 55, 55],
            [109, 79, 1, 1, 1, 72, 45, 45]),
    // gmt_drywet
    preset!([0, 42, 84, 127, 170, 212, 255],
            [47, 213, 103, 3, 1, 1, 1],
            [30, 147, 219, 219, 48, 1, 7],
            [2, 24, 52, 207, 214, 111, 33]),
    // ib_jul01
    preset!([0, 94, 132, 255],
            [194, 1, 57, 113],
            [1, 29, 131, 1],
            [1, 18, 28, 1]),
    // es_vintage_57
    preset!([0, 53, 104, 153, 255],
            [2, 18, 69, 167, 46],
            [1, 1, 29, 135, 56],
            [1, 0, 1, 10, 4]),
    // ib15
    preset!([0, 72, 89, 107, 141, 255],
            [113, 157, 208, 255, 137, 59],
            [91, 88, 85, 29, 31, 33],
            [147, 78, 33, 11, 39, 89]),
    // fuschia_7
    preset!([0, 63, 127, 191, 255],
            [43, 100, 188, 161, 135],
            [3, 4, 5, 11, 20],
            [153, 103, 66, 115, 182]),
    // es_emerald_dragon_08
    preset!([0, 101, 178, 255],
            [97, 47, 13, 2],
            [255, 133, 43, 10],
            [1, 1, 1, 1]),
    // lava
    preset!([0, 46, 96, 108, 119, 146, 174, 188, 202, 218, 234, 244, 255],
            [0, 18, 113, 142, 175, 213, 255, 255, 255, 255, 255, 255, 255],
            [0, 0, 0, 3, 17, 44, 82, 115, 156, 203, 255, 255, 255],
            [0, 0, 0, 1, 1, 2, 4, 4, 4, 4, 4, 71, 255]),
    // fire
    preset!([0, 76, 146, 197, 240, 250, 255],
            [1, 32, 192, 220, 252, 252, 255],
            [1, 5, 24, 105, 255, 255, 255],
            [0, 0, 0, 5, 31, 111, 255]),
    // colorfull
    preset!([0, 25, 60, 93, 106, 109, 113, 116, 124, 168, 255],
            [10, 29, 59, 83, 110, 123, 139, 192, 255, 100, 22],
            [85, 109, 138, 99, 66, 49, 35, 117, 255, 180, 121],
            [5, 18, 42, 52, 64, 65, 66, 98, 137, 155, 174]),
    // magenta_evening
    preset!([0, 31, 63, 70, 76, 108, 255],
            [71, 130, 213, 232, 252, 123, 46],
            [27, 11, 2, 1, 1, 2, 9],
            [39, 51, 64, 66, 69, 51, 35]),
    // pink_purple
    preset!([0, 25, 51, 76, 102, 109, 114, 122, 149, 183, 255],
            [19, 26, 33, 68, 118, 163, 217, 159, 113, 128, 146],
            [2, 4, 6, 62, 187, 215, 244, 149, 78, 57, 40],
            [39, 45, 52, 125, 240, 247, 255, 221, 188, 155, 123]),
    // es_autumn_19
    preset!([0, 51, 84, 104, 112, 122, 124, 135, 142, 163, 204, 249, 255],
            [26, 67, 118, 137, 113, 133, 137, 113, 139, 113, 55, 17, 17],
            [1, 4, 14, 152, 65, 149, 152, 65, 154, 13, 3, 1, 1],
            [1, 1, 1, 52, 1, 59, 52, 1, 46, 1, 1, 1, 1]),
    // black_blue_magenta_white
    preset!([0, 42, 84, 127, 170, 212, 255],
            [0, 0, 0, 42, 255, 255, 255],
            [0, 0, 0, 0, 0, 55, 255],
            [0, 45, 255, 255, 255, 255, 255]),
    // black_magenta_red
    preset!([0, 63, 127, 191, 255],
            [0, 42, 255, 255, 255],
            [0, 0, 0, 0, 0],
            [0, 45, 255, 45, 0]),
    // black_red_magenta_yellow
    preset!([0, 42, 84, 127, 170, 212, 255],
            [0, 42, 255, 255, 255, 255, 255],
            [0, 0, 0, 0, 0, 55, 255],
            [0, 0, 0, 45, 255, 45, 0]),
    // blue_cyan_yellow
    preset!([0, 63, 127, 191, 255],
            [0, 0, 0, 42, 255],
            [0, 55, 255, 255, 255],
            [255, 255, 255, 45, 0]),
];

/// Number of available presets.
pub fn palette_count() -> u8 {
    PRESETS.len() as u8
}

/// Build the preset at `index` (wrapping out-of-range indices).
pub fn preset(index: u8) -> Palette {
    let idx = usize::from(index) % PRESETS.len();
    PRESETS[idx].build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_has_expected_size() {
        assert_eq!(palette_count(), 33);
    }

    #[test]
    fn every_preset_has_matched_stop_tables() {
        for p in PRESETS {
            assert_eq!(p.positions.len(), p.r.len());
            assert_eq!(p.positions.len(), p.g.len());
            assert_eq!(p.positions.len(), p.b.len());
            assert!(p.positions.len() >= 2);
        }
    }

    #[test]
    fn positions_scale_to_unit_range() {
        let p = preset(0);
        assert_eq!(p.positions()[0], 0.0);
        assert_eq!(*p.positions().last().unwrap(), 1.0);
    }

    #[test]
    fn out_of_range_index_wraps() {
        let direct = preset(0);
        let wrapped = preset(palette_count());
        assert_eq!(direct.colors(), wrapped.colors());
    }
}
