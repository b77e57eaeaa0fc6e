// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    io::{self, BufReader, ErrorKind, Write},
    path::Path,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use rmp_serde::{
    config::{DefaultConfig, StructMapConfig},
    decode::ReadReader,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

type Writer = rmp_serde::Serializer<ChildStdin, StructMapConfig<DefaultConfig>>;
type Reader = rmp_serde::Deserializer<ReadReader<BufReader<ChildStdout>>, DefaultConfig>;

/// The grace period for the child to exit after its pipes are closed.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(150);

/// A python child process which exchanges msgpack messages over its stdin and stdout.
pub(crate) struct PythonChild {
    child: Child,
    // the whole message is always written at once, a BufWriter is of no use
    write_to: Option<Writer>,
    read_from: Option<Reader>,
}

fn closed_pipe() -> io::Error {
    io::Error::new(ErrorKind::BrokenPipe, "the pipes of the python child are closed")
}

impl PythonChild {
    /// Spawns `command python_file` within the `workspace`.
    ///
    /// The first element of `command` is the program, the remaining elements are its leading
    /// arguments, eg `["pipenv", "run", "python"]`.
    pub(crate) fn spawn(
        command: &[String],
        workspace: impl AsRef<Path>,
        python_file: impl AsRef<Path>,
    ) -> Result<Self, io::Error> {
        let Some((program, args)) = command.split_first() else {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "the python command is empty",
            ));
        };
        let mut child = Command::new(program)
            .args(args)
            .arg(python_file.as_ref())
            .current_dir(workspace.as_ref())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        debug!(pid = child.id(), program, "spawned python child");

        let write_to = child.stdin.take().ok_or_else(closed_pipe)?;
        let read_from = child.stdout.take().ok_or_else(closed_pipe)?;

        Ok(PythonChild {
            child,
            write_to: Some(rmp_serde::Serializer::new(write_to).with_struct_map()),
            read_from: Some(rmp_serde::Deserializer::new(BufReader::new(read_from))),
        })
    }

    fn read_message<V, E>(&mut self) -> Result<V, E>
    where
        V: DeserializeOwned,
        E: From<rmp_serde::decode::Error> + From<io::Error>,
    {
        let deserializer = self.read_from.as_mut().ok_or_else(closed_pipe)?;
        V::deserialize(deserializer).map_err(E::from)
    }

    fn write_message<M, E>(&mut self, msg: &M) -> Result<(), E>
    where
        M: Serialize,
        E: From<rmp_serde::encode::Error> + From<io::Error>,
    {
        let serializer = self.write_to.as_mut().ok_or_else(closed_pipe)?;
        msg.serialize(&mut *serializer)?;
        serializer.get_mut().flush()?;
        Ok(())
    }

    /// Sends a command and waits for its response.
    ///
    /// Failures reported by the child are mapped with `map_err`.
    pub(crate) fn send_command<C, M, E>(&mut self, cmd: &C, map_err: M) -> Result<C::Value, E>
    where
        C: PipeCommand,
        M: Fn(String) -> E,
        E: From<rmp_serde::encode::Error> + From<rmp_serde::decode::Error> + From<io::Error>,
    {
        self.write_message::<_, E>(&Message { tag: C::TAG, cmd })?;
        self.read_message::<Result<C::Value, String>, E>()?
            .map_err(map_err)
    }
}

impl Drop for PythonChild {
    fn drop(&mut self) {
        // closing the pipes triggers the shutdown of the child
        drop(self.write_to.take());
        drop(self.read_from.take());

        let start = Instant::now();
        let mut killed = false;
        while self.child.try_wait().is_ok_and(|exited| exited.is_none()) {
            if !killed && start.elapsed() > SHUTDOWN_TIMEOUT {
                warn!(pid = self.child.id(), "killing unresponsive python child");
                killed = self.child.kill().is_ok();
            }
            thread::yield_now();
        }
    }
}

/// A command which is understood by the python child.
pub(crate) trait PipeCommand: Serialize {
    type Value: DeserializeOwned;
    const TAG: &'static str;
}

#[derive(Serialize)]
struct Message<'a, T: PipeCommand> {
    tag: &'a str,
    cmd: &'a T,
}
