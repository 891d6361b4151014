use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{content_lines, DatasetTrait};

/// TUM RGB-D：`rgb.txt` 每行 `timestamp filename`，`#` 开头为注释
#[derive(Debug, Default)]
pub struct TumDataset {
    pub cam0s: Vec<(f64, PathBuf)>,
}

impl TumDataset {
    pub const DEFAULT_LIST: &'static str = "rgb.txt";

    pub fn new(path: &Path, file_name: &str) -> anyhow::Result<Self> {
        let cam0s = content_lines(&path.join(file_name))?
            .iter()
            .map(|line| {
                let mut fields = line.split_whitespace();
                let (Some(t), Some(name)) = (fields.next(), fields.next()) else {
                    anyhow::bail!("bad TUM line '{}'", line);
                };
                let t: f64 = t.parse().with_context(|| format!("bad timestamp '{}'", t))?;
                Ok((t, path.join(name)))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { cam0s })
    }
}

impl DatasetTrait for TumDataset {
    fn read_t_cam0_list(&self) -> &Vec<(f64, PathBuf)> {
        &self.cam0s
    }
}

#[test]
fn test_read_tum() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("rgb.txt"),
        "# color images\n# timestamp filename\n1305031102.175304 rgb/1305031102.175304.png\n",
    )
    .unwrap();
    let dataset = TumDataset::new(dir.path(), TumDataset::DEFAULT_LIST).unwrap();
    let list = dataset.read_t_cam0_list();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].0, 1305031102.175304);
    assert_eq!(list[0].1, dir.path().join("rgb/1305031102.175304.png"));
}
