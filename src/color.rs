use anyhow::{Result, anyhow};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Accepts `#rgb`, `#rrggbb`, a handful of names, and a `r,g,b` byte
    /// triple as used throughout the pipeline config.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(anyhow!("empty color value"));
        }
        if let Some(hex) = raw.strip_prefix('#') {
            return parse_hex(hex);
        }
        if raw.contains(',') {
            return parse_triple(raw);
        }
        match raw.to_ascii_lowercase().as_str() {
            "black" => Ok(Self::new(0, 0, 0)),
            "white" => Ok(Self::new(255, 255, 255)),
            "red" => Ok(Self::new(255, 0, 0)),
            "blue" => Ok(Self::new(0, 0, 255)),
            "green" => Ok(Self::new(0, 128, 0)),
            "gray" | "grey" => Ok(Self::new(128, 128, 128)),
            "darkgray" | "darkgrey" => Ok(Self::new(64, 64, 64)),
            other => Err(anyhow!("unsupported color '{}'", other)),
        }
    }

    pub fn to_rgba(self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

fn parse_triple(raw: &str) -> Result<RgbColor> {
    let parts: Vec<u8> = raw
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|err| anyhow!("invalid color triple '{}': {}", raw, err))?;
    if parts.len() != 3 {
        return Err(anyhow!("color triple '{}' must have 3 components", raw));
    }
    Ok(RgbColor::new(parts[0], parts[1], parts[2]))
}

fn parse_hex(hex: &str) -> Result<RgbColor> {
    match hex.len() {
        3 => {
            let bytes = hex.as_bytes();
            let r = hex_component(bytes[0] as char)?;
            let g = hex_component(bytes[1] as char)?;
            let b = hex_component(bytes[2] as char)?;
            Ok(RgbColor::new(r, g, b))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16)?;
            let g = u8::from_str_radix(&hex[2..4], 16)?;
            let b = u8::from_str_radix(&hex[4..6], 16)?;
            Ok(RgbColor::new(r, g, b))
        }
        _ => Err(anyhow!("invalid hex color '#{}'", hex)),
    }
}

fn hex_component(ch: char) -> Result<u8> {
    let s = format!("{ch}{ch}");
    Ok(u8::from_str_radix(&s, 16)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_triple_hex_and_names() {
        assert_eq!(RgbColor::parse("50, 50, 50").unwrap(), RgbColor::new(50, 50, 50));
        assert_eq!(RgbColor::parse("#ff9800").unwrap(), RgbColor::new(255, 152, 0));
        assert_eq!(RgbColor::parse("#fff").unwrap(), RgbColor::new(255, 255, 255));
        assert_eq!(RgbColor::parse("white").unwrap(), RgbColor::new(255, 255, 255));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(RgbColor::parse("").is_err());
        assert!(RgbColor::parse("10,20").is_err());
        assert!(RgbColor::parse("#12345").is_err());
        assert!(RgbColor::parse("chartreuse-ish").is_err());
    }
}
