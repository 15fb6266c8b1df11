//! Regression test parameters and operations

use crate::error::{TestError, TestResult};
use crate::{golden_dir, regout_dir};
use cvsu_core::PixelImage;
use cvsu_io::PnmVariant;
use std::fs;
use std::path::Path;

/// Regression test mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegTestMode {
    /// Generate golden files
    Generate,
    /// Compare with golden files (default)
    #[default]
    Compare,
    /// Display mode - run without comparison
    Display,
}

impl RegTestMode {
    /// Parse mode from the environment
    pub fn from_env() -> Self {
        match std::env::var("REGTEST_MODE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "generate" => Self::Generate,
            "display" => Self::Display,
            _ => Self::Compare,
        }
    }
}

/// Regression test state: name, running index, mode and failures
pub struct RegParams {
    /// Name of the test (e.g., "segmentation")
    pub test_name: String,
    index: usize,
    /// Test mode
    pub mode: RegTestMode,
    success: bool,
    failures: Vec<String>,
}

impl RegParams {
    /// Create new regression test parameters
    pub fn new(test_name: &str) -> Self {
        let mode = RegTestMode::from_env();

        let _ = fs::create_dir_all(golden_dir());
        let _ = fs::create_dir_all(regout_dir());

        eprintln!();
        eprintln!("////////////////////////////////////////////////");
        eprintln!("////////////////   {}_reg   ///////////////", test_name);
        eprintln!("////////////////////////////////////////////////");
        eprintln!("Mode: {:?}", mode);

        Self {
            test_name: test_name.to_string(),
            index: 0,
            mode,
            success: true,
            failures: Vec::new(),
        }
    }

    /// Get the current test index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Check if in display mode
    pub fn display(&self) -> bool {
        self.mode == RegTestMode::Display
    }

    /// Compare two floating-point values within a delta
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        self.index += 1;
        let diff = (expected - actual).abs();

        if diff > delta {
            let msg = format!(
                "Failure in {}_reg: value comparison for index {}\n\
                 difference = {} but allowed delta = {}\n\
                 expected = {}, actual = {}",
                self.test_name, self.index, diff, delta, expected, actual
            );
            eprintln!("{}", msg);
            self.failures.push(msg);
            self.success = false;
            false
        } else {
            true
        }
    }

    /// Compare two images for exact sample equality
    pub fn compare_images(&mut self, first: &PixelImage, second: &PixelImage) -> bool {
        self.index += 1;

        if first.width() != second.width()
            || first.height() != second.height()
            || first.ty() != second.ty()
            || first.step() != second.step()
        {
            let msg = format!(
                "Failure in {}_reg: image comparison for index {} - shape mismatch",
                self.test_name, self.index
            );
            eprintln!("{}", msg);
            self.failures.push(msg);
            self.success = false;
            return false;
        }

        for y in 0..first.height() {
            for x in 0..first.width() {
                for channel in 0..first.step() {
                    if first.get_sample(x, y, channel) != second.get_sample(x, y, channel) {
                        let msg = format!(
                            "Failure in {}_reg: image comparison for index {} - sample mismatch at ({}, {}, {})",
                            self.test_name, self.index, x, y, channel
                        );
                        eprintln!("{}", msg);
                        self.failures.push(msg);
                        self.success = false;
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Write an image as PNM and check it against its golden counterpart
    pub fn write_image_and_check(
        &mut self,
        image: &PixelImage,
        variant: PnmVariant,
    ) -> TestResult<()> {
        self.index += 1;

        let local_path = format!(
            "{}/{}.{:02}.pnm",
            regout_dir(),
            self.test_name,
            self.index
        );

        cvsu_io::write_image(image, &local_path, variant).map_err(|e| TestError::ImageWrite {
            path: local_path.clone(),
            message: e.to_string(),
        })?;

        self.check_file(&local_path)
    }

    /// Check a file against its golden counterpart
    ///
    /// Generate mode copies the file to golden; compare mode diffs the
    /// bytes (with a pixel-level fallback); display mode does nothing.
    fn check_file(&mut self, local_path: &str) -> TestResult<()> {
        let ext = Path::new(local_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let golden_path = format!(
            "{}/{}_golden.{:02}.{}",
            golden_dir(),
            self.test_name,
            self.index,
            ext
        );

        match self.mode {
            RegTestMode::Generate => {
                fs::copy(local_path, &golden_path)?;
                eprintln!("Generated: {}", golden_path);
            }
            RegTestMode::Compare => {
                if !Path::new(&golden_path).exists() {
                    let msg = format!(
                        "Failure in {}_reg: golden file not found: {}",
                        self.test_name, golden_path
                    );
                    eprintln!("{}", msg);
                    self.failures.push(msg);
                    self.success = false;
                    return Ok(());
                }

                let local_data = fs::read(local_path)?;
                let golden_data = fs::read(&golden_path)?;

                if local_data != golden_data
                    && !self.compare_image_files(local_path, &golden_path)
                {
                    let msg = format!(
                        "Failure in {}_reg, index {}: comparing {} with {}",
                        self.test_name, self.index, local_path, golden_path
                    );
                    eprintln!("{}", msg);
                    self.failures.push(msg);
                    self.success = false;
                }
            }
            RegTestMode::Display => {}
        }

        Ok(())
    }

    /// Compare two image files sample by sample
    fn compare_image_files(&self, first_path: &str, second_path: &str) -> bool {
        let Ok(first) = cvsu_io::read_image(first_path) else {
            return false;
        };
        let Ok(second) = cvsu_io::read_image(second_path) else {
            return false;
        };

        if first.width() != second.width()
            || first.height() != second.height()
            || first.ty() != second.ty()
        {
            return false;
        }

        for y in 0..first.height() {
            for x in 0..first.width() {
                for channel in 0..first.step() {
                    if first.get_sample(x, y, channel) != second.get_sample(x, y, channel) {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Write data to file and check against a golden file
    pub fn write_data_and_check(&mut self, data: &[u8], ext: &str) -> TestResult<()> {
        self.index += 1;

        let local_path = format!(
            "{}/{}.{:02}.{}",
            regout_dir(),
            self.test_name,
            self.index,
            ext
        );

        fs::write(&local_path, data)?;
        self.check_file(&local_path)
    }

    /// Clean up and report results
    pub fn cleanup(self) -> bool {
        if self.success {
            eprintln!("SUCCESS: {}_reg", self.test_name);
        } else {
            eprintln!("FAILURE: {}_reg", self.test_name);
            for failure in &self.failures {
                eprintln!("  {}", failure);
            }
        }
        eprintln!();

        self.success
    }

    /// Check if all tests have passed so far
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get the list of failures
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_env() {
        let mode = RegTestMode::from_env();
        assert!(matches!(
            mode,
            RegTestMode::Compare | RegTestMode::Generate | RegTestMode::Display
        ));
    }

    #[test]
    fn test_compare_values_success() {
        let mut rp = RegParams::new("params");
        assert!(rp.compare_values(100.0, 100.0, 0.0));
        assert!(rp.compare_values(100.0, 100.5, 1.0));
        assert!(rp.is_success());
    }

    #[test]
    fn test_compare_values_failure() {
        let mut rp = RegParams::new("params");
        assert!(!rp.compare_values(100.0, 200.0, 0.0));
        assert!(!rp.is_success());
        assert_eq!(rp.failures().len(), 1);
    }

    #[test]
    fn test_compare_images() {
        use cvsu_core::{PixelFormat, PixelImage, PixelType};
        let mut rp = RegParams::new("params");
        let a = PixelImage::new_continuous(PixelType::U8, PixelFormat::Grey, 4, 4).unwrap();
        let mut b = a.clone();
        assert!(rp.compare_images(&a, &b));
        b.set_sample(1, 1, 0, 9.0).unwrap();
        assert!(!rp.compare_images(&a, &b));
    }
}
