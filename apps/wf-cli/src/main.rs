use std::f64::consts::PI;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;
use wf_aero::{AirfoilPolar, BladeMotion, PolarSet};
use wf_core::WakeOptions;
use wf_core::units::{m, mps, radps, s};
use wf_sim::{
    SimOptions, SimResult, UniformWind, WakeSink, WakeSnapshot, WakeSolver, run_sim,
};
use wf_wake::Vec3;

#[derive(Parser)]
#[command(name = "wf-cli")]
#[command(about = "WakeFlow CLI - free-vortex-wake rotor simulation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a case file without running it
    Validate {
        /// Path to the case YAML file
        case_path: PathBuf,
    },
    /// Run a case and print wake statistics
    Run {
        /// Path to the case YAML file
        case_path: PathBuf,
        /// Override the end time (seconds)
        #[arg(long)]
        t_end: Option<f64>,
        /// Print wake statistics every N seconds
        #[arg(long, default_value_t = 0.1)]
        report_every: f64,
    },
}

/// Rotor definition for the demo driver: identical straight blades
/// rotating about the x axis at constant speed.
#[derive(Debug, Deserialize)]
struct RotorDef {
    n_blades: usize,
    /// Blade tip radius (m)
    radius_m: f64,
    /// Blade root radius (m)
    root_m: f64,
    /// Uniform chord (m)
    chord_m: f64,
    /// Rotor speed (rpm)
    rpm: f64,
    /// Hub height above ground (m)
    hub_height_m: f64,
}

#[derive(Debug, Deserialize)]
struct CaseFile {
    name: String,
    rotor: RotorDef,
    /// Ambient wind (m/s), along the rotor axis by convention
    wind_mps: [f64; 3],
    /// Simulated time (s)
    t_end_s: f64,
    wake: WakeOptions,
}

impl CaseFile {
    fn load(path: &PathBuf) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let case: CaseFile =
            serde_yaml::from_str(&text).map_err(|e| format!("cannot parse case file: {e}"))?;
        case.validate()?;
        Ok(case)
    }

    fn validate(&self) -> Result<(), String> {
        self.wake
            .validate()
            .map_err(|e| format!("wake options: {e}"))?;
        if self.rotor.n_blades != self.wake.n_wings {
            return Err(format!(
                "rotor has {} blades but wake is configured for {} wings",
                self.rotor.n_blades, self.wake.n_wings
            ));
        }
        if self.rotor.root_m <= 0.0 || self.rotor.radius_m <= self.rotor.root_m {
            return Err("rotor radii must satisfy 0 < root < tip".to_string());
        }
        if self.t_end_s <= 0.0 {
            return Err("t_end_s must be positive".to_string());
        }
        Ok(())
    }
}

/// Blade motion of one rotor blade at time `t`, rotating in the y-z plane.
fn blade_motion(rotor: &RotorDef, blade: usize, n_span: usize, t: f64) -> BladeMotion {
    // Case quantities enter in explicit SI units
    let omega = radps(rotor.rpm * 2.0 * PI / 60.0).value;
    let tip = m(rotor.radius_m).value;
    let root = m(rotor.root_m).value;
    let hub = Vec3::new(0.0, 0.0, m(rotor.hub_height_m).value);

    let psi = omega * t + 2.0 * PI * blade as f64 / rotor.n_blades as f64;
    let radial = Vec3::new(0.0, psi.cos(), psi.sin());
    let tangent = Vec3::new(0.0, -psi.sin(), psi.cos());

    let n_nodes = n_span + 1;
    let mut nodes = Vec::with_capacity(n_nodes);
    let mut velocities = Vec::with_capacity(n_nodes);
    for j in 0..n_nodes {
        let r = root + (tip - root) * j as f64 / n_span as f64;
        nodes.push(hub + r * radial);
        velocities.push(omega * r * tangent);
    }

    BladeMotion {
        nodes,
        // Chord lies in the rotor plane, pointing against the motion so the
        // axial inflow is seen at a positive angle of attack
        chord_dirs: vec![-tangent; n_nodes],
        normals: vec![Vec3::x(); n_nodes],
        chords: vec![rotor.chord_m; n_nodes],
        velocities,
    }
}

/// Prints one line of wake statistics per snapshot.
struct StatsSink;

impl WakeSink for StatsSink {
    fn emit(&mut self, snapshot: &WakeSnapshot) -> SimResult<()> {
        let mut max_gamma: f64 = 0.0;
        let mut downstream: f64 = 0.0;
        for wing in &snapshot.wings {
            for row in &wing.gamma_nw {
                for &g in row {
                    max_gamma = max_gamma.max(g.abs());
                }
            }
            for row in wing.r_nw.iter().chain(wing.r_fw.iter()) {
                for p in row {
                    downstream = downstream.max(p.x);
                }
            }
        }
        println!(
            "t={:8.4}s  nNW={:3}  nFW={:3}  max|gamma|={:8.4}  wake extent x={:8.3} m",
            snapshot.t, snapshot.n_nw, snapshot.n_fw, max_gamma, downstream
        );
        Ok(())
    }
}

fn run_case(case: &CaseFile, t_end: Option<f64>, report_every: f64) -> Result<(), String> {
    let opts = case.wake.clone();
    let polars = PolarSet::new(vec![AirfoilPolar::thin_airfoil(721)])
        .map_err(|e| format!("polar setup: {e}"))?;
    let mut solver = WakeSolver::new(opts.clone(), polars, vec![0; opts.n_span], vec![])
        .map_err(|e| format!("solver setup: {e}"))?;
    solver.add_sink(Box::new(StatsSink), report_every);

    let wind_vec = Vec3::new(
        mps(case.wind_mps[0]).value,
        mps(case.wind_mps[1]).value,
        mps(case.wind_mps[2]).value,
    );
    let mut wind = UniformWind(wind_vec);

    let rotor = &case.rotor;
    let n_span = opts.n_span;
    let n_blades = rotor.n_blades;
    let motion_fn = |t: f64| -> Vec<BladeMotion> {
        (0..n_blades)
            .map(|b| blade_motion(rotor, b, n_span, t))
            .collect()
    };

    let sim = SimOptions {
        t_end: s(t_end.unwrap_or(case.t_end_s)).value,
        ..Default::default()
    };

    info!(case = %case.name, t_end = sim.t_end, "starting run");
    let steps = run_sim(&mut solver, motion_fn, &mut wind, &sim)
        .map_err(|e| format!("simulation failed: {e}"))?;

    let out = solver
        .calc_output(sim.t_end, &motion_fn(sim.t_end), &mut wind)
        .map_err(|e| format!("output calculation failed: {e}"))?;
    println!("\ncompleted {steps} steps");
    for (iw, gamma) in out.gamma_ll.iter().enumerate() {
        let mean = gamma.iter().sum::<f64>() / gamma.len() as f64;
        println!("blade {iw}: mean circulation {mean:8.4} m^2/s");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Validate { case_path } => CaseFile::load(&case_path).map(|case| {
            println!("{}: ok", case.name);
        }),
        Commands::Run {
            case_path,
            t_end,
            report_every,
        } => CaseFile::load(&case_path)
            .and_then(|case| run_case(&case, t_end, report_every)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
