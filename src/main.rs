use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::RgbImage;
use ndarray::Array2;

use vslam_eval::config::{DEPTH_SENTINEL, TRACK_LENGTH};
use vslam_eval::dataset::{DataType, DatasetTrait};
use vslam_eval::depth::{self, DepthErrors, DepthWriteMode};
use vslam_eval::save::{self, FramePointsSave};
use vslam_eval::slam::{FrameInput, Sensor, System};
use vslam_eval::trajectory::TrajectoryEvaluator;
use vslam_eval::Error;

#[derive(Debug, Parser)]
#[command(author, version, about = "Dense depth and relative poses from a visual SLAM backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the SLAM system and save, at each frame, the current depth and pose
    Run(RunArgs),
    /// Evaluate saved depth maps against ground truth depth maps
    EvalDepth(EvalDepthArgs),
    /// Evaluate saved relative poses against ground truth poses
    EvalPose(EvalPoseArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SensorArg {
    Mono,
    Stereo,
    MonoImu,
    StereoImu,
}

impl From<SensorArg> for Sensor {
    fn from(arg: SensorArg) -> Self {
        match arg {
            SensorArg::Mono => Sensor::Monocular,
            SensorArg::Stereo => Sensor::Stereo,
            SensorArg::MonoImu => Sensor::MonocularImu,
            SensorArg::StereoImu => Sensor::StereoImu,
        }
    }
}

#[derive(Debug, Args)]
struct RunArgs {
    /// path to dataset
    #[arg(long)]
    dataset: PathBuf,
    #[arg(long, value_enum, default_value_t = DataType::Kitti)]
    data_type: DataType,
    /// which configuration?
    #[arg(long, default_value = "settings.yaml")]
    settings: PathBuf,
    /// where do we save artefacts?
    #[arg(long, default_value = "results")]
    dest: PathBuf,
    #[arg(long, value_enum, default_value_t = SensorArg::Mono)]
    sensor: SensorArg,
    /// saved pose is (T - offset) -> T, 0 saves 0 -> T
    #[arg(long, default_value_t = 1)]
    pose_offset: usize,
    /// ground truth depth maps named after the frames, evaluated on the fly
    #[arg(long)]
    gt_depth: Option<PathBuf>,
    /// also dump colored point clouds
    #[arg(long)]
    save_points: bool,
    /// keep the nearest point when several project to one pixel
    #[arg(long)]
    nearest_depth: bool,
}

#[derive(Debug, Args)]
struct EvalDepthArgs {
    /// directory of predicted 16-bit depth maps
    #[arg(long)]
    pred: PathBuf,
    /// directory of ground truth depth maps with the same file names
    #[arg(long)]
    gt: PathBuf,
    #[arg(long, value_enum, default_value_t = DataType::Kitti)]
    data_type: DataType,
    #[arg(long, default_value = "results")]
    dest: PathBuf,
}

#[derive(Debug, Args)]
struct EvalPoseArgs {
    /// directory of predicted pose files
    #[arg(long)]
    pred: PathBuf,
    /// directory of ground truth pose files with the same names
    #[arg(long)]
    gt: PathBuf,
    #[arg(long, default_value_t = TRACK_LENGTH)]
    track_length: usize,
    #[arg(long, default_value = "results")]
    dest: PathBuf,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_nanos()
        .init();

    if let Err(err) = try_main() {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(&args),
        Command::EvalDepth(args) => eval_depth(&args),
        Command::EvalPose(args) => eval_pose(&args),
    }
}

fn frame_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn load_rgb(path: &Path) -> anyhow::Result<RgbImage> {
    let image =
        image::open(path).with_context(|| format!("failed to load image {}", path.display()))?;
    Ok(image.to_rgb8())
}

fn frame_input(
    sensor: Sensor,
    dataset: &dyn DatasetTrait,
    idx: usize,
    image: RgbImage,
    prev_t: f64,
    t: f64,
) -> anyhow::Result<FrameInput> {
    let right = || -> anyhow::Result<RgbImage> {
        let cam1 = dataset
            .read_t_cam1_list()
            .context("dataset has no right camera")?;
        let (_, path) = cam1.get(idx).context("right camera list is shorter than left")?;
        load_rgb(path)
    };
    Ok(match sensor {
        Sensor::Monocular => FrameInput::Mono(image),
        Sensor::Stereo => FrameInput::Stereo {
            left: image,
            right: right()?,
        },
        Sensor::MonocularImu => FrameInput::MonoImu {
            image,
            imu: dataset.imu_between(prev_t, t),
        },
        Sensor::StereoImu => FrameInput::StereoImu {
            left: image,
            right: right()?,
            imu: dataset.imu_between(prev_t, t),
        },
        Sensor::Rgbd => anyhow::bail!("RGBD input is not supported from the command line"),
    })
}

fn run(args: &RunArgs) -> anyhow::Result<()> {
    let sensor = Sensor::from(args.sensor);
    let mut app = System::new(&args.settings, sensor)?;
    if args.nearest_depth {
        app.set_depth_write_mode(DepthWriteMode::Nearest);
    }

    let dataset = args.data_type.open(&args.dataset)?;
    let frames = dataset.read_t_cam0_list();
    log::info!("{} images in {:?}", frames.len(), args.dataset);

    let dest_depth = args.dest.join("depth");
    let dest_pose = args.dest.join("pose");
    let dest_points = args.dest.join("points");
    save::create_dir(&dest_depth)?;
    save::create_dir(&dest_pose)?;
    if args.save_points {
        save::create_dir(&dest_points)?;
    }
    let results_path = args.dest.join("results.txt");
    let range = args.data_type.depth_encoding().range();

    let mut states = Vec::with_capacity(frames.len());
    let mut errors = Vec::new();
    let mut prev_t = f64::NEG_INFINITY;
    for (idx, (t, image_path)) in frames.iter().enumerate() {
        let image = load_rgb(image_path)?;
        let (w, h) = image.dimensions();
        let input = frame_input(sensor, dataset.as_ref(), idx, image, prev_t, *t)?;
        let state = app.process_frame(input, *t)?;
        prev_t = *t;
        states.push(state);

        let name = frame_name(image_path);
        // 跟踪失败时保存全部无效的深度图
        let depth = app
            .get_depth()
            .unwrap_or_else(|| Array2::from_elem((h as usize, w as usize), DEPTH_SENTINEL));
        depth::save_depth(dest_depth.join(format!("{}.png", name)), &depth)?;

        save_frame_pose(&app, args.pose_offset, &args.dest, &name, args.data_type)?;

        if args.save_points {
            if let Some(points) = app.get_point_cloud_colored() {
                FramePointsSave::new(&name, *t, points).save(&dest_points)?;
            }
        }

        if let (Some(gt_dir), Some(observations)) = (&args.gt_depth, app.get_observations()) {
            let gt_path = gt_dir.join(format!("{}.png", name));
            let gt = depth::read_depth(&gt_path, args.data_type.depth_encoding())
                .with_context(|| format!("gt path err {}", gt_path.display()))?;
            match depth::evaluate_observations(&observations, &gt, range) {
                Ok(err) => {
                    save::save_depth_err_results(&results_path, &name, &err)?;
                    errors.push(err);
                }
                Err(Error::Degenerate(reason)) => log::warn!("frame {}: {}", name, reason),
                Err(e) => return Err(e.into()),
            }
        }
        log::debug!("frame {} {}: {}", idx, name, state);
    }

    save::write_state_log(args.dest.join("log.txt"), &states)?;
    let tracked = states.iter().filter(|s| s.is_ok()).count();
    log::info!("tracked {} of {} frames", tracked, states.len());
    if !errors.is_empty() {
        report_mean(&results_path, &errors)?;
    }
    app.shutdown();
    Ok(())
}

/// 保存 `(T - offset) -> T` 位姿并追加台账
///
/// 跟踪失败或历史不足 `offset` 帧时不保存，返回 `false`。
fn save_frame_pose(
    app: &System,
    offset: usize,
    dest: &Path,
    name: &str,
    data_type: DataType,
) -> anyhow::Result<bool> {
    let pose = match app.get_pose_to_target(Some(offset)) {
        Ok(Some(pose)) => pose,
        Ok(None) => return Ok(false),
        Err(Error::PoseIndex { offset, available }) => {
            log::warn!(
                "frame {}: offset {} exceeds {} tracked frame(s), pose not saved",
                name,
                offset,
                available
            );
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };
    save::save_pose(dest.join("pose"), name, &pose)?;
    match data_type {
        DataType::KittiVo => save::append_pose_and_times_txt(dest, name, &pose)?,
        _ => save::append_pose_txt(dest, name, &pose)?,
    }
    Ok(true)
}

fn report_mean(results_path: &Path, errors: &[DepthErrors]) -> anyhow::Result<()> {
    let mean = DepthErrors::mean(errors)?;
    save::save_depth_err_results(results_path, "mean", &mean)?;
    println!(
        "{}",
        DepthErrors::HEADERS
            .iter()
            .map(|h| format!("{:>8} | ", h))
            .collect::<String>()
    );
    println!(
        "{}",
        mean.as_array()
            .iter()
            .map(|v| format!("&{:8.3}  ", v))
            .collect::<String>()
    );
    Ok(())
}

fn sorted_pngs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.retain(|p| p.extension().is_some_and(|e| e == "png"));
    paths.sort();
    Ok(paths)
}

fn eval_depth(args: &EvalDepthArgs) -> anyhow::Result<()> {
    save::create_dir(&args.dest)?;
    let results_path = args.dest.join("results.txt");
    let encoding = args.data_type.depth_encoding();
    let range = encoding.range();

    let mut errors = Vec::new();
    for pred_path in sorted_pngs(&args.pred)? {
        let name = frame_name(&pred_path);
        let gt_path = args.gt.join(format!("{}.png", name));
        if !gt_path.is_file() {
            log::warn!("gt path err {}", gt_path.display());
            continue;
        }
        // 预测深度图总是按 256 编码保存，跟踪失败的帧全部为 0
        let pred = match depth::read_depth(&pred_path, depth::DepthEncoding::Kitti) {
            Ok(pred) => pred,
            Err(Error::DepthFormat { reason, .. }) => {
                log::warn!("frame {}: {}", name, reason);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let gt = depth::read_depth(&gt_path, encoding)?;
        match depth::evaluate_depth_map(&pred, &gt, range) {
            Ok(err) => {
                save::save_depth_err_results(&results_path, &name, &err)?;
                errors.push(err);
            }
            Err(Error::Degenerate(reason)) => log::warn!("frame {}: {}", name, reason),
            Err(e) => return Err(e.into()),
        }
    }
    if errors.is_empty() {
        anyhow::bail!("no frame of {} could be evaluated", args.pred.display());
    }
    report_mean(&results_path, &errors)
}

fn eval_pose(args: &EvalPoseArgs) -> anyhow::Result<()> {
    let pred = save::load_pose_dir(&args.pred)?;
    let mut pred_poses = Vec::with_capacity(pred.len());
    let mut gt_poses = Vec::with_capacity(pred.len());
    for (name, pose) in pred {
        let gt_path = args.gt.join(format!("{}.json", name));
        let gt = save::load_pose(&gt_path)
            .with_context(|| format!("failed to load ground truth pose {}", gt_path.display()))?;
        pred_poses.push(pose);
        gt_poses.push(gt);
    }

    let result = TrajectoryEvaluator::new(args.track_length).evaluate(&pred_poses, &gt_poses)?;
    save::create_dir(&args.dest)?;
    save::append_trajectory_error(args.dest.join("results.txt"), &result)?;
    println!(
        "\n   Trajectory error: {:0.3}, std: {:0.3}\n",
        result.mean, result.std
    );
    Ok(())
}
