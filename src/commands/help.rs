//! `--help`: usage text (spec §6). Exit code 0.

pub fn run() {
    print!("{}", crate::args::usage());
}
