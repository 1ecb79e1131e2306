//! Serializers for [`WellVolumePlan`].
//!
//! The CSV writers are generic over [`std::io::Write`]; [`write_plan`] lays the
//! configured set of files out in a directory.

use crate::color::Channel;
use crate::config::OutputConfig;
use crate::error::{Result, ValidationError};
use crate::plan::WellVolumePlan;
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

fn format_volume(plan: &WellVolumePlan, volume: f64) -> String {
    match plan.settings.precision {
        Some(places) => format!("{:.*}", places as usize, volume),
        None => volume.to_string(),
    }
}

/// One row per well and channel: `Well,Channel,Volume(<unit>)`.
pub fn write_records<W: Write>(
    plan: &WellVolumePlan,
    writer: W,
    dispense_ids: bool,
    skip_zero: bool,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    let volume_header = format!("Volume({})", plan.settings.unit);

    csv.write_record(["Well", "Channel", volume_header.as_str()])?;

    for record in plan.records() {
        if skip_zero && record.volume == 0.0 {
            continue;
        }

        let channel = if dispense_ids {
            record.channel.dispenser_id().to_string()
        } else {
            record.channel.letter().to_string()
        };

        csv.write_record([
            record.well.to_string(),
            channel,
            format_volume(plan, record.volume),
        ])?;
    }

    csv.flush()?;

    Ok(())
}

/// Plate-shaped matrix of one channel. With `headers` the first row holds the
/// column numbers and every row starts with its row label.
pub fn write_channel_matrix<W: Write>(
    plan: &WellVolumePlan,
    channel: Channel,
    writer: W,
    headers: bool,
) -> Result<()> {
    let matrix = plan
        .channel_matrix(channel)
        .ok_or(ValidationError::MissingChannel(channel.letter()))?;

    let mut csv = csv::Writer::from_writer(writer);

    if headers {
        let mut header = vec![String::new()];
        header.extend((1..=plan.cols).map(|col| col.to_string()));
        csv.write_record(&header)?;
    }

    for (row, values) in matrix.iter().enumerate() {
        let mut record = Vec::with_capacity(plan.cols + 1);

        if headers {
            record.push(row_label(plan, row));
        }

        record.extend(values.iter().map(|v| format_volume(plan, *v)));
        csv.write_record(&record)?;
    }

    csv.flush()?;

    Ok(())
}

fn row_label(plan: &WellVolumePlan, row: usize) -> String {
    plan.well(row, 0)
        .map(|w| w.well.row.clone())
        .unwrap_or_default()
}

#[cfg(feature = "xlsx")]
#[derive(Clone, Debug, PartialEq)]
enum InfoValue {
    Text(String),
    Number(f64),
}

/// Parameter rows of the workbook's `Info` sheet.
#[cfg(feature = "xlsx")]
fn info_rows(plan: &WellVolumePlan) -> Vec<(String, InfoValue)> {
    let settings = &plan.settings;

    vec![
        (
            format!("Max Volume ({})", settings.unit),
            InfoValue::Number(settings.max_volume),
        ),
        ("Unit".to_string(), InfoValue::Text(settings.unit.symbol().to_string())),
        ("Policy".to_string(), InfoValue::Text(settings.policy.to_string())),
        ("Rows".to_string(), InfoValue::Number(plan.rows as f64)),
        ("Cols".to_string(), InfoValue::Number(plan.cols as f64)),
    ]
}

#[cfg(feature = "xlsx")]
pub fn workbook(plan: &WellVolumePlan) -> Result<rust_xlsxwriter::Workbook> {
    let mut workbook = rust_xlsxwriter::Workbook::new();

    let info = workbook.add_worksheet();
    info.set_name("Info")?;
    info.write_string(0, 0, "Parameter")?;
    info.write_string(0, 1, "Value")?;

    for (row, (parameter, value)) in info_rows(plan).into_iter().enumerate() {
        let row = row as u32 + 1;
        info.write_string(row, 0, parameter)?;

        match value {
            InfoValue::Text(text) => info.write_string(row, 1, text)?,
            InfoValue::Number(number) => info.write_number(row, 1, number)?,
        };
    }

    for &channel in &plan.channels {
        let Some(matrix) = plan.channel_matrix(channel) else {
            continue;
        };

        let sheet = workbook.add_worksheet();
        sheet.set_name(channel.letter())?;

        for col in 0..plan.cols {
            sheet.write_number(0, col as u16 + 1, (col + 1) as f64)?;
        }

        for (row, values) in matrix.iter().enumerate() {
            let xlsx_row = row as u32 + 1;
            sheet.write_string(xlsx_row, 0, row_label(plan, row))?;

            for (col, volume) in values.iter().enumerate() {
                sheet.write_number(xlsx_row, col as u16 + 1, *volume)?;
            }
        }
    }

    Ok(workbook)
}

fn create(path: &Path) -> Result<std::io::BufWriter<std::fs::File>> {
    let fh = std::fs::File::create(path)?;
    info!("Writing {}", path.display());
    Ok(std::io::BufWriter::new(fh))
}

/// Writes every file enabled in `output` into `dir`, named after `stem` and the
/// plate size. Returns the written paths.
pub fn write_plan(
    plan: &WellVolumePlan,
    dir: &Path,
    stem: &str,
    output: &OutputConfig,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let base = format!("{}_{}x{}", stem, plan.rows, plan.cols);
    let mut written = Vec::new();

    if output.records {
        let path = dir.join(format!("{base}_dispense.csv"));
        write_records(plan, create(&path)?, output.dispense_ids, output.skip_zero)?;
        written.push(path);
    }

    if output.matrices {
        for &channel in &plan.channels {
            let path = dir.join(format!("{base}_{channel}.csv"));
            write_channel_matrix(plan, channel, create(&path)?, true)?;
            written.push(path);

            let path = dir.join(format!("{base}_{channel}_matrix_only.csv"));
            write_channel_matrix(plan, channel, create(&path)?, false)?;
            written.push(path);
        }
    }

    #[cfg(feature = "xlsx")]
    {
        if output.workbook {
            let path = dir.join(format!("{base}_{}.xlsx", plan.settings.policy));
            info!("Writing {}", path.display());
            workbook(plan)?.save(&path)?;
            written.push(path);
        }
    }

    if output.json {
        let path = dir.join(format!("{base}.json"));
        let mut writer = create(&path)?;
        serde_json::to_writer_pretty(&mut writer, plan)?;
        writer.flush()?;
        written.push(path);
    }

    Ok(written)
}
