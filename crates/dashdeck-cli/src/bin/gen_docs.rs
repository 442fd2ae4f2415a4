//! Binary that emits command-line options markdown to stdout.

fn main() {
    print!("{}", dashdeck_cli::render_options_markdown());
}
