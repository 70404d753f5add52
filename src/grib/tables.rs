/// GRIB1 short name for an ECMWF (table version, parameter) pair.
pub fn short_name(table_version: u8, parameter: u8) -> String {
    let name = match (table_version, parameter) {
        (128, 34) => "sst",
        (128, 51) => "mx2t24",
        (128, 52) => "mn2t24",
        (128, 151) => "msl",
        (128, 167) => "2t",
        (128, 228) => "tp",
        (228, 172) => "tprate",
        _ => return format!("var{parameter}"),
    };
    name.to_string()
}

/// MARS `type` code to the `dataType` key.
pub fn data_type(mars_type: u8) -> &'static str {
    match mars_type {
        9 => "fc",
        10 => "cf",
        11 => "pf",
        17 => "em",
        18 => "es",
        80 => "fcmean",
        81 => "fcmax",
        82 => "fcmin",
        83 => "fcstdev",
        _ => "unknown",
    }
}
