//! Yosys and OpenFPGA script templates and their `${NAME}` substitution.

pub const DEFAULT_YOSYS_SCRIPT: &str = r#"
# Yosys synthesis script for ${TOP_MODULE}
# Read source files
${READ_DESIGN_FILES}

# Technology mapping
hierarchy -top ${TOP_MODULE}
proc
${KEEP_NAMES}
techmap -D NO_LUT -map +/adff2dff.v

# Synthesis
flatten
opt_expr
opt_clean
check
opt -nodffe -nosdff
fsm
opt -nodffe -nosdff
wreduce
peepopt
opt_clean
opt -nodffe -nosdff
memory -nomap
opt_clean
opt -fast -full -nodffe -nosdff
memory_map
opt -full -nodffe -nosdff
techmap
opt -fast -nodffe -nosdff
clean

# LUT mapping
abc -lut ${LUT_SIZE}

# Check
synth -run check

# Clean and output blif
opt_clean -purge
write_blif ${OUTPUT_BLIF}
write_verilog -noexpr -nodec -defparam -norename ${OUTPUT_VERILOG}
"#;

pub const DEFAULT_OPENFPGA_SCRIPT: &str = r#"
vpr ${VPR_ARCH_FILE} ${VPR_TESTBENCH_BLIF} --clock_modeling ideal${OPENFPGA_VPR_DEVICE_LAYOUT} --net_file ${NET_FILE} --place_file ${PLACE_FILE} --route_file ${ROUTE_FILE} --route_chan_width ${OPENFPGA_VPR_ROUTE_CHAN_WIDTH} --sdc_file ${SDC_FILE} --absorb_buffer_luts off --write_rr_graph rr_graph.openfpga.xml --constant_net_method route --circuit_format ${OPENFPGA_VPR_CIRCUIT_FORMAT} --analysis

# Read OpenFPGA architecture definition
read_openfpga_arch -f ${OPENFPGA_ARCH_FILE}

read_openfpga_bitstream_setting -f ${OPENFPGA_BITSTREAM_SETTING_FILE}

# Annotate the OpenFPGA architecture to VPR data base
link_openfpga_arch --sort_gsb_chan_node_in_edges

# Apply fix-up to clustering nets based on routing results
pb_pin_fixup --verbose

# Apply fix-up to Look-Up Table truth tables based on packing results
lut_truth_table_fixup

# Build the module graph
build_fabric --compress_routing --duplicate_grid_pin

# Repack the netlist to physical pbs
repack

build_architecture_bitstream

build_fabric_bitstream
write_fabric_bitstream --format plain_text --file fabric_bitstream.bit
write_io_mapping -f PinMapping.xml

# Finish and exit OpenFPGA
exit
"#;

/// Replaces every `${KEY}` in `template`, in the order given.
pub fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("${{{key}}}"), value)
    })
}

/// Design language family, from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Verilog,
    SystemVerilog,
    Vhdl,
    /// Already synthesized: `.blif`, `.eblif`, gate-level `.vg`.
    Netlist,
}

impl SourceKind {
    pub fn of(path: &str) -> Self {
        let ext = std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "sv" | "svh" => SourceKind::SystemVerilog,
            "vhd" | "vhdl" => SourceKind::Vhdl,
            "blif" | "eblif" | "vg" => SourceKind::Netlist,
            _ => SourceKind::Verilog,
        }
    }
}

/// The `read_verilog` line for the default Yosys parser.
pub fn read_design_files(files: &[String], include_paths: &[String]) -> String {
    let sv = files
        .iter()
        .any(|f| SourceKind::of(f) == SourceKind::SystemVerilog);
    let mut line = String::from("read_verilog");
    if sv {
        line.push_str(" -sv");
    }
    for inc in include_paths {
        line.push_str(" -I");
        line.push_str(inc);
    }
    for f in files {
        line.push(' ');
        line.push_str(f);
    }
    line
}
