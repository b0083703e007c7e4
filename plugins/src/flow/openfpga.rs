use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use fabflow_core::change::{detect_change, ChangeStatus, DesignInputs, LocalFs, StepArtifacts};
use fabflow_core::config::{FlowConfig, ToolsConfig};
use fabflow_core::error::ToolError;
use fabflow_core::task::ActionContext;

use super::scripts::{self, SourceKind, DEFAULT_OPENFPGA_SCRIPT, DEFAULT_YOSYS_SCRIPT};
use super::state::CompileState;
use crate::runner::{ToolCommand, ToolOutcome, ToolRunner};

const DEFAULT_CHANNEL_WIDTH: u32 = 100;

/// Which VPR engine a stage drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VprStep {
    Pack,
    Place,
    Route,
    Analysis,
}

impl VprStep {
    fn flag(self) -> &'static str {
        match self {
            VprStep::Pack => "--pack",
            VprStep::Place => "--place",
            VprStep::Route => "--route",
            VprStep::Analysis => "--analysis",
        }
    }
}

/// Tools run inside the work directory, so every path handed to them has to
/// stay valid from there.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// The Yosys/VPR/OpenFPGA compiler, one method per pipeline stage.
///
/// Every stage runs its tool in `<project.directory>/<project.name>` and
/// appends the tool output to the stage log. Stage methods block; call them
/// from the controller thread, not from async code.
#[derive(Debug)]
pub struct OpenFpgaFlow {
    name: String,
    top_module: String,
    project_dir: PathBuf,
    work_dir: PathBuf,
    inputs: DesignInputs,
    tools: ToolsConfig,
    runner: ToolRunner,
    state: Mutex<CompileState>,
}

impl OpenFpgaFlow {
    pub fn new(cfg: &FlowConfig, runner: ToolRunner) -> Self {
        let project_dir = absolute(Path::new(&cfg.project.directory));
        let work_dir = project_dir.join(&cfg.project.name);
        let flow = Self {
            name: cfg.project.name.clone(),
            top_module: cfg.project.top_module.clone(),
            project_dir,
            work_dir,
            inputs: cfg.project.inputs.clone(),
            tools: cfg.tools.clone(),
            runner,
            state: Mutex::new(CompileState::None),
        };
        flow.set_state(flow.recover_state());
        flow
    }

    /// Furthest state whose output a previous run left in the work directory.
    fn recover_state(&self) -> CompileState {
        let steps = [
            (self.file("_bitstream.cmd"), CompileState::BitstreamGenerated),
            (self.file("_post_synth.route"), CompileState::Routed),
            (self.file("_post_synth.place"), CompileState::Placed),
            (self.file("_post_synth.net"), CompileState::Packed),
            (self.file("_post_synth.blif"), CompileState::Synthesized),
            (self.work_dir.clone(), CompileState::IpGenerated),
        ];
        let state = steps
            .into_iter()
            .find(|(path, _)| path.exists())
            .map(|(_, state)| state)
            .unwrap_or_default();
        if state != CompileState::None {
            tracing::debug!(?state, work_dir = %self.work_dir.display(), "recovered compile state");
        }
        state
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn state(&self) -> CompileState {
        *self.lock_state()
    }

    fn lock_state(&self) -> MutexGuard<'_, CompileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: CompileState) {
        *self.lock_state() = state;
    }

    /// Drops the state back to `floor` if it is currently past it.
    fn lower_state(&self, floor: CompileState) {
        let mut state = self.lock_state();
        if *state > floor {
            *state = floor;
        }
    }

    fn require(&self, ok: impl Fn(CompileState) -> bool, stage: &str) -> anyhow::Result<()> {
        let state = self.state();
        if ok(state) {
            Ok(())
        } else {
            Err(ToolError::Precondition(format!("{stage} cannot run from state {state:?}")).into())
        }
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.work_dir.join(format!("{}{suffix}", self.name))
    }

    fn sdc_file(&self) -> PathBuf {
        self.file("_openfpga.sdc")
    }

    /// Design files with globs expanded, resolved against the project
    /// directory.
    fn design_files(&self) -> anyhow::Result<Vec<String>> {
        let mut files = Vec::new();
        for token in self
            .inputs
            .design_files
            .iter()
            .flat_map(|entry| entry.split(' '))
            .filter(|t| !t.trim().is_empty())
        {
            let full = self.project_dir.join(token.trim());
            let pattern = full.to_string_lossy().into_owned();
            let matches: Vec<_> = glob::glob(&pattern)
                .with_context(|| format!("bad design file pattern {pattern}"))?
                .filter_map(Result::ok)
                .collect();
            if matches.is_empty() {
                files.push(pattern);
            } else {
                files.extend(matches.into_iter().map(|p| p.to_string_lossy().into_owned()));
            }
        }
        Ok(files)
    }

    fn include_paths(&self) -> Vec<String> {
        self.inputs
            .include_paths
            .iter()
            .flat_map(|entry| entry.split(' '))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| self.project_dir.join(t).to_string_lossy().into_owned())
            .collect()
    }

    /// Synthesis inputs with globs expanded and every path resolved, as the
    /// change detector has to stat them.
    fn resolved_inputs(&self, files: &[String]) -> DesignInputs {
        let libraries = self
            .inputs
            .library_paths
            .iter()
            .flat_map(|entry| entry.split(' '))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| self.project_dir.join(t).to_string_lossy().into_owned())
            .collect();
        DesignInputs {
            design_files: files.to_vec(),
            include_paths: self.include_paths(),
            library_paths: libraries,
        }
    }

    /// Pre-synthesized netlist given as the design, if any.
    fn gate_level_input(&self) -> anyhow::Result<Option<String>> {
        let files = self.design_files()?;
        Ok(files
            .into_iter()
            .find(|f| SourceKind::of(f) == SourceKind::Netlist))
    }

    /// Netlist VPR consumes.
    fn netlist(&self) -> anyhow::Result<String> {
        match self.gate_level_input()? {
            Some(netlist) => Ok(netlist),
            None => Ok(self.file("_post_synth.blif").to_string_lossy().into_owned()),
        }
    }

    fn architecture(&self) -> anyhow::Result<&str> {
        self.tools.architecture.as_deref().ok_or_else(|| {
            ToolError::Precondition("no VPR architecture file configured".into()).into()
        })
    }

    fn base_vpr_command(&self) -> anyhow::Result<ToolCommand> {
        let width = self.tools.channel_width.unwrap_or(DEFAULT_CHANNEL_WIDTH);
        let mut cmd = ToolCommand::new(&self.tools.vpr, &self.work_dir)
            .arg(self.architecture()?)
            .arg(self.netlist()?)
            .arg("--sdc_file")
            .arg(self.sdc_file().to_string_lossy())
            .arg("--route_chan_width")
            .arg(width.to_string());
        if let Some(size) = &self.tools.device_size {
            cmd = cmd.arg("--device").arg(size);
        }
        Ok(cmd)
    }

    fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
        std::fs::write(path, contents).map_err(|source| {
            ToolError::Io {
                context: format!("writing {}", path.display()),
                source,
            }
            .into()
        })
    }

    fn remove_files(paths: &[PathBuf]) {
        for path in paths {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), "cannot remove: {e}"),
            }
        }
    }

    /// Truncates the stage log with a header, then runs the tool appending to it.
    fn run_tool(
        &self,
        ctx: &ActionContext,
        mut cmd: ToolCommand,
        log: Option<&Path>,
    ) -> anyhow::Result<()> {
        if let Some(log) = log {
            let header = format!(
                "# {} started {}\n# {}\n",
                ctx.title,
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                cmd.command_line()
            );
            Self::write_file(log, &header)?;
            cmd = cmd.log_to(log);
        }
        match self.runner.run(&cmd, &ctx.cancel)? {
            ToolOutcome::Exited(0) => Ok(()),
            ToolOutcome::Exited(code) => Err(ToolError::NonZeroExit {
                tool: cmd.program.clone(),
                code,
            }
            .into()),
            ToolOutcome::Cancelled => Err(ToolError::Cancelled(cmd.program.clone()).into()),
        }
    }

    fn run_vpr(
        &self,
        ctx: &ActionContext,
        step: VprStep,
        cmd_suffix: &str,
        extra_cmd_text: &str,
        log: Option<&Path>,
    ) -> anyhow::Result<()> {
        let cmd = self.base_vpr_command()?.arg(step.flag());
        let saved = format!("{}{extra_cmd_text}\n", cmd.command_line());
        Self::write_file(&self.file(cmd_suffix), &saved)?;
        self.run_tool(ctx, cmd, log)
    }

    pub fn ip_generate(&self, _ctx: &ActionContext, _log: Option<&Path>) -> anyhow::Result<bool> {
        std::fs::create_dir_all(&self.work_dir).map_err(|source| ToolError::Io {
            context: format!("creating {}", self.work_dir.display()),
            source,
        })?;
        self.set_state(CompileState::IpGenerated);
        Ok(true)
    }

    /// Checks every design file resolves to something on disk.
    pub fn analysis(&self, _ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        let files = self.design_files()?;
        if files.is_empty() {
            return Err(ToolError::Precondition("no design files configured".into()).into());
        }
        let missing: Vec<_> = files.iter().filter(|f| !Path::new(f).exists()).collect();
        if !missing.is_empty() {
            for f in &missing {
                tracing::error!("design file not found: {f}");
            }
            return Ok(false);
        }
        if let Some(log) = log {
            let mut text = String::from("# Analysis\n");
            for f in &files {
                text.push_str(f);
                text.push('\n');
            }
            Self::write_file(log, &text)?;
        }
        tracing::info!(files = files.len(), "design files found");
        Ok(true)
    }

    fn synthesis_script(&self, files: &[String]) -> anyhow::Result<String> {
        let template = match &self.tools.synthesis_script {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("cannot read synthesis script {path}"))?,
            None => DEFAULT_YOSYS_SCRIPT.to_string(),
        };
        let includes = self.include_paths();
        let sv = files
            .iter()
            .any(|f| SourceKind::of(f) == SourceKind::SystemVerilog);
        let blif = self.file("_post_synth.blif").to_string_lossy().into_owned();
        let verilog = self.file("_post_synth.v").to_string_lossy().into_owned();
        let lut_size = self.tools.lut_size.to_string();
        let include_flags = includes
            .iter()
            .map(|i| format!("-I{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let read = scripts::read_design_files(files, &includes);
        let verilog_files = files.join(" ");
        Ok(scripts::substitute(
            &template,
            &[
                ("READ_DESIGN_FILES", read.as_str()),
                ("TOP_MODULE", self.top_module.as_str()),
                ("KEEP_NAMES", ""),
                ("LUT_SIZE", lut_size.as_str()),
                ("OUTPUT_BLIF", blif.as_str()),
                ("OUTPUT_VERILOG", verilog.as_str()),
                ("INCLUDE_PATHS", include_flags.as_str()),
                ("VERILOG_FILES", verilog_files.as_str()),
                ("READ_VERILOG_OPTIONS", if sv { "-sv" } else { "" }),
            ],
        ))
    }

    /// Runs Yosys unless neither the sources nor the script changed since the
    /// last netlist was written.
    pub fn synthesis(&self, ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        if let Some(netlist) = self.gate_level_input()? {
            tracing::info!("gate-level netlist {netlist} given, skipping synthesis");
            self.set_state(CompileState::Synthesized);
            return Ok(true);
        }

        let files = self.design_files()?;
        let script = self.synthesis_script(&files)?;
        let script_path = self.file(".ys");
        let blif = self.file("_post_synth.blif");
        // All paths are already resolved against the project directory.
        let step = StepArtifacts {
            base_dir: Path::new(""),
            artifact: &blif,
            saved_script: &script_path,
            script: &script,
        };
        match detect_change(&LocalFs, &step, &self.resolved_inputs(&files)) {
            ChangeStatus::Unchanged => {
                tracing::info!("design {} is up to date, skipping synthesis", self.name);
                self.set_state(CompileState::Synthesized);
                return Ok(true);
            }
            ChangeStatus::Changed(reason) => tracing::info!("synthesizing: {reason}"),
        }

        Self::remove_files(&[blif.clone(), self.file("_post_synth.v")]);
        Self::write_file(&script_path, &script)?;
        let cmd = ToolCommand::new(&self.tools.yosys, &self.work_dir)
            .arg("-s")
            .arg(script_path.to_string_lossy());
        self.run_tool(ctx, cmd, log)?;
        self.set_state(CompileState::Synthesized);
        Ok(true)
    }

    /// Writes the constraint file and the packing command line, then packs.
    pub fn packing(&self, ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        self.require(|s| s >= CompileState::Synthesized, "packing")?;
        Self::write_file(&self.sdc_file(), "")?;
        self.run_vpr(ctx, VprStep::Pack, "_pack.cmd", "", log)?;
        self.set_state(CompileState::Packed);
        Ok(true)
    }

    /// VPR has no separate global placer; this only checks the design is packed.
    pub fn global_placement(&self, _ctx: &ActionContext, _log: Option<&Path>) -> anyhow::Result<bool> {
        self.require(CompileState::can_place, "global placement")?;
        self.set_state(CompileState::GloballyPlaced);
        Ok(true)
    }

    pub fn placement(&self, ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        self.require(CompileState::can_place, "placement")?;
        self.run_vpr(ctx, VprStep::Place, "_place.cmd", "", log)?;
        self.set_state(CompileState::Placed);
        Ok(true)
    }

    pub fn routing(&self, ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        self.require(CompileState::can_route, "routing")?;
        self.run_vpr(ctx, VprStep::Route, "_route.cmd", "", log)?;
        self.set_state(CompileState::Routed);
        Ok(true)
    }

    /// Static timing analysis on the routed design. The saved command opens
    /// the VPR viewer when replayed.
    pub fn timing_analysis(&self, ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        self.require(|s| s >= CompileState::Routed, "timing analysis")?;
        self.run_vpr(ctx, VprStep::Analysis, "_sta.cmd", " --disp on", log)?;
        Ok(true)
    }

    pub fn power_analysis(&self, ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        self.require(|s| s >= CompileState::Routed, "power analysis")?;
        let cmd = self.base_vpr_command()?.arg(VprStep::Analysis.flag());
        self.run_tool(ctx, cmd, log)?;
        Ok(true)
    }

    fn openfpga_script(&self, arch: &str) -> anyhow::Result<String> {
        let template = match &self.tools.openfpga_script {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("cannot read OpenFPGA script {path}"))?,
            None => DEFAULT_OPENFPGA_SCRIPT.to_string(),
        };
        // Without a bitstream setting file the command reading it goes too.
        let template: String = match &self.tools.bitstream_setting {
            Some(_) => template,
            None => template
                .lines()
                .filter(|l| !l.contains("${OPENFPGA_BITSTREAM_SETTING_FILE}"))
                .map(|l| format!("{l}\n"))
                .collect(),
        };
        let layout = self
            .tools
            .device_size
            .as_ref()
            .map(|s| format!(" --device {s}"))
            .unwrap_or_default();
        let width = self
            .tools
            .channel_width
            .unwrap_or(DEFAULT_CHANNEL_WIDTH)
            .to_string();
        let lossy = |p: PathBuf| p.to_string_lossy().into_owned();
        let netlist = self.netlist()?;
        let net = lossy(self.file("_post_synth.net"));
        let place = lossy(self.file("_post_synth.place"));
        let route = lossy(self.file("_post_synth.route"));
        let sdc = lossy(self.sdc_file());
        Ok(scripts::substitute(
            &template,
            &[
                ("VPR_ARCH_FILE", self.architecture()?),
                ("VPR_TESTBENCH_BLIF", netlist.as_str()),
                ("OPENFPGA_VPR_DEVICE_LAYOUT", layout.as_str()),
                ("NET_FILE", net.as_str()),
                ("PLACE_FILE", place.as_str()),
                ("ROUTE_FILE", route.as_str()),
                ("OPENFPGA_VPR_ROUTE_CHAN_WIDTH", width.as_str()),
                ("SDC_FILE", sdc.as_str()),
                ("OPENFPGA_VPR_CIRCUIT_FORMAT", "blif"),
                ("OPENFPGA_ARCH_FILE", arch),
                (
                    "OPENFPGA_BITSTREAM_SETTING_FILE",
                    self.tools.bitstream_setting.as_deref().unwrap_or_default(),
                ),
            ],
        ))
    }

    /// Generates the bitstream with OpenFPGA. Without an OpenFPGA architecture
    /// there is nothing to generate and the stage succeeds.
    pub fn bitstream(&self, ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        self.require(CompileState::can_generate_bitstream, "bitstream generation")?;
        let Some(arch) = self.tools.openfpga_architecture.clone() else {
            tracing::info!("no OpenFPGA architecture configured, skipping bitstream generation");
            return Ok(true);
        };
        let script_path = self.file(".openfpga");
        Self::write_file(&script_path, &self.openfpga_script(&arch)?)?;
        let cmd = ToolCommand::new(&self.tools.openfpga, &self.work_dir)
            .arg("-f")
            .arg(script_path.to_string_lossy());
        Self::write_file(&self.file("_bitstream.cmd"), &format!("{}\n", cmd.command_line()))?;
        self.run_tool(ctx, cmd, log)?;
        self.set_state(CompileState::BitstreamGenerated);
        Ok(true)
    }

    fn clean(&self, files: Vec<PathBuf>, log: Option<&Path>, floor: Option<CompileState>) -> bool {
        let mut files = files;
        files.extend(log.map(Path::to_path_buf));
        Self::remove_files(&files);
        if let Some(floor) = floor {
            self.lower_state(floor);
        }
        true
    }

    pub fn analysis_clean(&self, _ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        Ok(self.clean(Vec::new(), log, None))
    }

    pub fn synthesis_clean(&self, _ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        let files = vec![
            self.file(".ys"),
            self.file("_post_synth.blif"),
            self.file("_post_synth.v"),
        ];
        Ok(self.clean(files, log, Some(CompileState::IpGenerated)))
    }

    pub fn packing_clean(&self, _ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        let files = vec![
            self.file("_post_synth.net"),
            self.file("_pack.cmd"),
            self.sdc_file(),
        ];
        Ok(self.clean(files, log, Some(CompileState::Synthesized)))
    }

    pub fn global_placement_clean(
        &self,
        _ctx: &ActionContext,
        log: Option<&Path>,
    ) -> anyhow::Result<bool> {
        Ok(self.clean(Vec::new(), log, Some(CompileState::Packed)))
    }

    pub fn placement_clean(&self, _ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        let files = vec![self.file("_post_synth.place"), self.file("_place.cmd")];
        Ok(self.clean(files, log, Some(CompileState::Packed)))
    }

    pub fn routing_clean(&self, _ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        let files = vec![self.file("_post_synth.route"), self.file("_route.cmd")];
        Ok(self.clean(files, log, Some(CompileState::Placed)))
    }

    pub fn timing_clean(&self, _ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        Ok(self.clean(vec![self.file("_sta.cmd")], log, None))
    }

    pub fn power_clean(&self, _ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        Ok(self.clean(Vec::new(), log, None))
    }

    pub fn bitstream_clean(&self, _ctx: &ActionContext, log: Option<&Path>) -> anyhow::Result<bool> {
        let files = vec![
            self.file(".openfpga"),
            self.file("_bitstream.cmd"),
            self.work_dir.join("fabric_bitstream.bit"),
            self.work_dir.join("PinMapping.xml"),
        ];
        Ok(self.clean(files, log, Some(CompileState::Routed)))
    }
}
