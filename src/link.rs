//! Construcción de ejecutables.
//!
//! Una vez que se ha emitido código C, este debe compilarse para
//! producir un binario ejecutable. Esta operación se delega a un
//! compilador de C externo, `cc` por defecto, que recibe el código
//! generado por su entrada estándar.

use std::{
    ffi::OsStr,
    io::{self, BufWriter, Write},
    path::Path,
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
};

use bitflags::bitflags;
use thiserror::Error;

/// Compilador a utilizar si no se indica otro.
pub const DEFAULT_COMPILER: &str = "cc";

bitflags! {
    /// Opciones a aplicar durante la compilación.
    pub struct BuildOptions: u32 {
        /// Remover símbolos de depuración del ejecutable final.
        const STRIP = 0x01;

        /// Compilar con optimizaciones.
        const OPTIMIZE = 0x02;
    }
}

/// Un error de compilación del código generado.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BuildError {
    /// Ocurrió un evento de error de E/S durante la invocación
    /// de comandos externos.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// El compilador inició su ejecución, pero falló en compilar.
    #[error("C compiler exited with status code {0:?}")]
    Failed(ExitStatus),
}

/// Instancia del compilador de C para un ejecutable definido.
pub struct Compiler {
    child: Child,
    stdin: BufWriter<ChildStdin>,
}

impl Compiler {
    /// Inicia una instancia del compilador.
    ///
    /// El compilador tratará de emitir un ejecutable y escribirlo a
    /// la ruta indicada por `output`.
    pub fn spawn<C, O>(compiler: C, output: &O, opts: BuildOptions) -> Result<Self, BuildError>
    where
        C: AsRef<OsStr>,
        O: AsRef<Path>,
    {
        let mut command = command(compiler.as_ref(), output.as_ref(), opts);
        log::debug!("Spawning {:?}", command);

        let mut child = command.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "C compiler has no stdin"))?;

        Ok(Compiler {
            child,
            stdin: BufWriter::new(stdin),
        })
    }

    /// Obtiene la entrada estándar del proceso que espera recibir código C.
    pub fn stdin(&mut self) -> &mut BufWriter<ChildStdin> {
        &mut self.stdin
    }

    /// Indica el fin del flujo de código y espera a que termine la compilación.
    pub fn finish(mut self) -> Result<(), BuildError> {
        self.stdin.flush()?;
        drop(self.stdin);

        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(BuildError::Failed(status))
        }
    }
}

/// Construye la línea de comandos del compilador.
fn command(compiler: &OsStr, output: &Path, opts: BuildOptions) -> Command {
    let mut command = Command::new(compiler);
    command
        .arg("-o")
        .arg(output)
        // El código llega por stdin, por lo que el lenguaje no puede
        // inferirse a partir de una extensión
        .args(&["-x", "c", "-"])
        .stdin(Stdio::piped());

    if opts.contains(BuildOptions::OPTIMIZE) {
        command.arg("-O2");
    }

    if opts.contains(BuildOptions::STRIP) {
        command.arg("-s");
    }

    command
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(opts: BuildOptions) -> Vec<String> {
        let command = command(OsStr::new("cc"), Path::new("out"), opts);
        command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn plain_build() {
        assert_eq!(args(BuildOptions::empty()), ["-o", "out", "-x", "c", "-"]);
    }

    #[test]
    fn build_options() {
        let all = args(BuildOptions::STRIP | BuildOptions::OPTIMIZE);
        assert_eq!(all[5..], ["-O2", "-s"]);
    }
}
